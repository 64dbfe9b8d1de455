//! Collect data action state machine

use crate::client::{ClientError, DataClient};
use crate::executor::params::ParamSources;
use crate::executor::{ActionError, FetchStage};
use crate::models::{
    ActionRequest, FlowData, PayloadData, StepMessage, FLOW_ID_PARAM, LOG_DATA_PARAM,
    PAYLOAD_ID_PARAM,
};
use crate::reporter::{StepReporter, StepUpdater};
use serde::Serialize;
use std::sync::Arc;

pub const MSG_STARTED: &str = "Collecting data from AlertFlow";
pub const MSG_FLOW_COLLECTED: &str = "Flow Data collected";
pub const MSG_PAYLOAD_COLLECTED: &str = "Payload Data collected";
pub const MSG_COMPLETED: &str = "Data collection completed";
pub const MSG_IDS_REQUIRED: &str = "FlowID and PayloadID are required";
pub const DATA_DUMP_TITLE: &str = "Collected Data";

/// Position of an execution in the collect data state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Validating,
    Started,
    FetchingFlow,
    FetchingPayload,
    Completed,
    Failed,
}

/// Data handed back to the runner on success
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionOutput {
    pub flow: FlowData,
    pub payload: PayloadData,
}

/// Identifiers and options resolved from a request
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedInputs {
    flow_id: String,
    payload_id: String,
    log_data: bool,
}

/// Fetches the flow and payload of an execution while reporting progress on
/// its step. One instance serves exactly one request.
pub struct CollectDataAction {
    data_client: Arc<dyn DataClient>,
    updater: Arc<dyn StepUpdater>,
    state: ExecutorState,
}

impl CollectDataAction {
    pub fn new(data_client: Arc<dyn DataClient>, updater: Arc<dyn StepUpdater>) -> Self {
        Self {
            data_client,
            updater,
            state: ExecutorState::Validating,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Run the action to completion
    pub async fn execute(&mut self, request: &ActionRequest) -> Result<ActionOutput, ActionError> {
        let action_id = Some(request.action.id.clone()).filter(|id| !id.is_empty());
        let mut reporter = StepReporter::new(
            self.updater.clone(),
            request.execution.id.clone(),
            &request.step,
            action_id,
        );

        let result = self.run(request, &mut reporter).await;
        match &result {
            Ok(_) => {
                tracing::info!(execution_id = %request.execution.id, "Data collection completed");
            }
            Err(e) => {
                self.transition(ExecutorState::Failed);
                tracing::warn!(
                    execution_id = %request.execution.id,
                    error = %e,
                    "Data collection failed"
                );
            }
        }
        result
    }

    async fn run(
        &mut self,
        request: &ActionRequest,
        reporter: &mut StepReporter,
    ) -> Result<ActionOutput, ActionError> {
        let inputs = match resolve_inputs(request) {
            Ok(inputs) => inputs,
            Err(e) => {
                reporter.fail(MSG_IDS_REQUIRED).await?;
                return Err(e);
            }
        };
        self.transition(ExecutorState::Started);

        reporter.start(MSG_STARTED).await?;
        self.transition(ExecutorState::FetchingFlow);

        let flow = match self
            .data_client
            .fetch_flow(&inputs.flow_id, &request.execution.id)
            .await
        {
            Ok(flow) => flow,
            Err(source) => {
                return Err(Self::fetch_failed(reporter, FetchStage::Flow, source).await);
            }
        };
        reporter.message(MSG_FLOW_COLLECTED).await?;
        self.transition(ExecutorState::FetchingPayload);

        let payload = match self.data_client.fetch_payload(&inputs.payload_id).await {
            Ok(payload) => payload,
            Err(source) => {
                return Err(Self::fetch_failed(reporter, FetchStage::Payload, source).await);
            }
        };
        reporter.message(MSG_PAYLOAD_COLLECTED).await?;

        let mut summary = vec![StepMessage::text(MSG_COMPLETED)];
        if inputs.log_data {
            summary.push(StepMessage::group(
                DATA_DUMP_TITLE,
                vec![
                    format!("Flow: {}", flow.0),
                    format!("Payload: {}", payload.0),
                ],
            ));
        }
        reporter.succeed(summary).await?;
        self.transition(ExecutorState::Completed);

        Ok(ActionOutput { flow, payload })
    }

    /// Record a failed lookup on the step; a failing report takes precedence
    async fn fetch_failed(
        reporter: &mut StepReporter,
        stage: FetchStage,
        source: ClientError,
    ) -> ActionError {
        let error = ActionError::RemoteFetch { stage, source };
        match reporter.fail(error.to_string()).await {
            Ok(()) => error,
            Err(report_error) => report_error.into(),
        }
    }

    fn transition(&mut self, next: ExecutorState) {
        tracing::debug!(from = ?self.state, to = ?next, "Executor state change");
        self.state = next;
    }
}

fn resolve_inputs(request: &ActionRequest) -> Result<ResolvedInputs, ActionError> {
    let sources = ParamSources::for_request(&request.args, &request.action, &request.execution);

    let flow_id = sources.get(FLOW_ID_PARAM);
    let payload_id = sources.get(PAYLOAD_ID_PARAM);

    match (flow_id, payload_id) {
        (Some(flow_id), Some(payload_id)) => Ok(ResolvedInputs {
            flow_id: flow_id.to_string(),
            payload_id: payload_id.to_string(),
            log_data: sources.flag(LOG_DATA_PARAM),
        }),
        (flow_id, payload_id) => {
            let mut missing = Vec::new();
            if flow_id.is_none() {
                missing.push(FLOW_ID_PARAM);
            }
            if payload_id.is_none() {
                missing.push(PAYLOAD_ID_PARAM);
            }
            Err(ActionError::Validation { missing })
        }
    }
}
