//! Execution, step and action records exchanged with the runner and backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle status of a single execution step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Created by the runner, not yet picked up
    #[default]
    Pending,
    /// The plugin is working on the step
    Running,
    /// The step completed successfully
    #[serde(alias = "finished")]
    Success,
    /// The step failed
    Error,
}

impl StepStatus {
    /// Whether no further transition is allowed from this status
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Error)
    }

    /// Whether moving from `self` to `next` respects the step lifecycle.
    ///
    /// `pending -> error` is only legitimate for requests rejected before
    /// any work started.
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Pending, StepStatus::Error)
                | (StepStatus::Running, StepStatus::Success)
                | (StepStatus::Running, StepStatus::Error)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Success => "success",
            StepStatus::Error => "error",
        };
        write!(f, "{}", value)
    }
}

/// One entry of a step's progress log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StepMessage {
    /// Plain progress note
    Text(String),
    /// Titled group of lines
    Group { title: String, lines: Vec<String> },
}

impl StepMessage {
    pub fn text(text: impl Into<String>) -> Self {
        StepMessage::Text(text.into())
    }

    pub fn group(title: impl Into<String>, lines: Vec<String>) -> Self {
        StepMessage::Group {
            title: title.into(),
            lines,
        }
    }

    /// Whether the message mentions `needle` in its title or any line
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            StepMessage::Text(text) => text.contains(needle),
            StepMessage::Group { title, lines } => {
                title.contains(needle) || lines.iter().any(|line| line.contains(needle))
            }
        }
    }
}

impl From<&str> for StepMessage {
    fn from(value: &str) -> Self {
        StepMessage::Text(value.to_string())
    }
}

impl From<String> for StepMessage {
    fn from(value: String) -> Self {
        StepMessage::Text(value)
    }
}

/// Progress record of one action within an execution, as owned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExecutionStep {
    pub id: String,
    #[serde(default)]
    pub execution_id: String,
    #[serde(default)]
    pub action_id: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub messages: Vec<StepMessage>,
}

impl ExecutionStep {
    /// Merge a partial update into this record.
    ///
    /// Messages are appended; every other field is only overwritten when the
    /// patch carries it.
    pub fn apply(&mut self, patch: &StepPatch) {
        if let Some(action_id) = &patch.action_id {
            self.action_id = action_id.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(finished_at) = patch.finished_at {
            self.finished_at = Some(finished_at);
        }
        self.messages.extend(patch.messages.iter().cloned());
    }
}

/// Partial step update sent to the backend; absent fields are left untouched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StepPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Entries to append to the step log
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<StepMessage>,
}

impl StepPatch {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            id: step_id.into(),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<StepMessage>) -> Self {
        self.messages.push(message.into());
        self
    }
}

/// Owning execution of a step, carrying the default identifiers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub flow_id: String,
    #[serde(default)]
    pub payload_id: String,
}

/// Key/value parameter configured on an action in a flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionParam {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Action record the step belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Action {
    pub id: String,
    /// Declared parameters; `None` when the action carries no configuration
    #[serde(default)]
    pub params: Option<Vec<ActionParam>>,
}

impl Action {
    pub fn has_declared_params(&self) -> bool {
        self.params.as_ref().is_some_and(|params| !params.is_empty())
    }
}

/// Input of one action execution, as sent by the runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActionRequest {
    pub execution: Execution,
    pub step: ExecutionStep,
    pub action: Action,
    /// Request-level argument table; overrides everything else
    #[serde(default)]
    pub args: HashMap<String, String>,
}
