//! Step lifecycle reporting
//!
//! The runner only sees plugin progress through the step record, so every
//! update is awaited and every failure is handed back to the caller.

use crate::client::ClientError;
use crate::models::{ExecutionStep, StepMessage, StepPatch, StepStatus};
use crate::services::logging::log_step_transition;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Backend write access to execution steps
#[async_trait]
pub trait StepUpdater: Send + Sync {
    /// Merge `patch` into the step record of `execution_id`
    async fn update_step(&self, execution_id: &str, patch: &StepPatch) -> Result<(), ClientError>;
}

/// Failures while reporting step progress
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportingError {
    #[error("Invalid step transition from {from} to {to}")]
    InvalidTransition { from: StepStatus, to: StepStatus },

    #[error("Step already finished with status {0}")]
    StepClosed(StepStatus),

    #[error("Failed to update step: {0}")]
    Update(#[from] ClientError),
}

/// Writes the progress of one step, enforcing the status lifecycle locally
pub struct StepReporter {
    updater: Arc<dyn StepUpdater>,
    execution_id: String,
    step_id: String,
    action_id: Option<String>,
    status: StepStatus,
    started_at: Option<DateTime<Utc>>,
}

impl StepReporter {
    pub fn new(
        updater: Arc<dyn StepUpdater>,
        execution_id: impl Into<String>,
        step: &ExecutionStep,
        action_id: Option<String>,
    ) -> Self {
        Self {
            updater,
            execution_id: execution_id.into(),
            step_id: step.id.clone(),
            action_id,
            status: step.status,
            started_at: step.started_at,
        }
    }

    /// Status last written by this reporter
    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Mark the step as running.
    ///
    /// A step the runner already marked as running only gets the message.
    pub async fn start(&mut self, message: impl Into<StepMessage>) -> Result<(), ReportingError> {
        let mut patch = self.patch(vec![message.into()]);
        patch.action_id = self.action_id.clone();

        if self.status != StepStatus::Running {
            self.check_transition(StepStatus::Running)?;
            let now = Utc::now();
            patch.status = Some(StepStatus::Running);
            patch.started_at = Some(now);
            self.send(patch).await?;
            self.started_at = Some(now);
            self.commit(StepStatus::Running);
            return Ok(());
        }

        self.send(patch).await
    }

    /// Append progress notes without changing the status
    pub async fn message(&mut self, message: impl Into<StepMessage>) -> Result<(), ReportingError> {
        if self.status.is_terminal() {
            return Err(ReportingError::StepClosed(self.status));
        }
        let patch = self.patch(vec![message.into()]);
        self.send(patch).await
    }

    /// Finish the step successfully
    pub async fn succeed(&mut self, messages: Vec<StepMessage>) -> Result<(), ReportingError> {
        self.finish(StepStatus::Success, messages).await
    }

    /// Finish the step with an error.
    ///
    /// Allowed straight from `pending` for requests rejected before starting.
    pub async fn fail(&mut self, message: impl Into<StepMessage>) -> Result<(), ReportingError> {
        self.finish(StepStatus::Error, vec![message.into()]).await
    }

    async fn finish(
        &mut self,
        status: StepStatus,
        messages: Vec<StepMessage>,
    ) -> Result<(), ReportingError> {
        self.check_transition(status)?;

        let now = Utc::now();
        let started_at = self.started_at.unwrap_or(now);
        let mut patch = self.patch(messages);
        patch.status = Some(status);
        if self.started_at.is_none() {
            patch.action_id = self.action_id.clone();
            patch.started_at = Some(started_at);
        }
        patch.finished_at = Some(now.max(started_at));

        self.send(patch).await?;
        self.started_at = Some(started_at);
        self.commit(status);
        Ok(())
    }

    fn check_transition(&self, next: StepStatus) -> Result<(), ReportingError> {
        if self.status.is_terminal() {
            return Err(ReportingError::StepClosed(self.status));
        }
        if !self.status.can_transition_to(next) {
            return Err(ReportingError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        Ok(())
    }

    fn commit(&mut self, next: StepStatus) {
        log_step_transition(&self.execution_id, &self.step_id, self.status, next);
        self.status = next;
    }

    fn patch(&self, messages: Vec<StepMessage>) -> StepPatch {
        StepPatch {
            messages,
            ..StepPatch::new(self.step_id.clone())
        }
    }

    async fn send(&self, patch: StepPatch) -> Result<(), ReportingError> {
        self.updater
            .update_step(&self.execution_id, &patch)
            .await
            .map_err(|e| {
                tracing::error!(
                    execution_id = %self.execution_id,
                    step_id = %self.step_id,
                    error = %e,
                    "Step update failed"
                );
                ReportingError::Update(e)
            })
    }
}
