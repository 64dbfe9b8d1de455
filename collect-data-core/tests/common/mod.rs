//! Shared test doubles for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use collect_data_core::client::{ClientError, DataClient};
use collect_data_core::models::{
    Action, ActionParam, ActionRequest, Execution, ExecutionStep, FlowData, PayloadData,
    StepMessage, StepPatch, StepStatus, FLOW_ID_PARAM, LOG_DATA_PARAM, PAYLOAD_ID_PARAM,
};
use collect_data_core::reporter::StepUpdater;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Backend double that records every call and keeps a merged step record
pub struct InMemoryBackend {
    flows: HashMap<String, Value>,
    payloads: HashMap<String, Value>,
    state: Mutex<RecordedState>,
    fail_update_at: Option<usize>,
}

#[derive(Default)]
struct RecordedState {
    flow_calls: Vec<(String, String)>,
    payload_calls: Vec<String>,
    patches: Vec<(String, StepPatch)>,
    logs: Vec<Vec<StepMessage>>,
    step: ExecutionStep,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            flows: HashMap::new(),
            payloads: HashMap::new(),
            state: Mutex::new(RecordedState {
                step: ExecutionStep {
                    id: "step-1".to_string(),
                    execution_id: "exec-1".to_string(),
                    ..ExecutionStep::default()
                },
                ..RecordedState::default()
            }),
            fail_update_at: None,
        }
    }

    pub fn with_flow(mut self, id: &str, record: Value) -> Self {
        self.flows.insert(id.to_string(), record);
        self
    }

    pub fn with_payload(mut self, id: &str, record: Value) -> Self {
        self.payloads.insert(id.to_string(), record);
        self
    }

    /// Make the n-th step update (0-based) fail as unreachable
    pub fn failing_update_at(mut self, index: usize) -> Self {
        self.fail_update_at = Some(index);
        self
    }

    pub fn flow_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().flow_calls.clone()
    }

    pub fn payload_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().payload_calls.clone()
    }

    pub fn patches(&self) -> Vec<StepPatch> {
        self.state
            .lock()
            .unwrap()
            .patches
            .iter()
            .map(|(_, patch)| patch.clone())
            .collect()
    }

    /// Copy of the step's message log taken after every accepted update
    pub fn log_snapshots(&self) -> Vec<Vec<StepMessage>> {
        self.state.lock().unwrap().logs.clone()
    }

    /// Statuses in the order they were written
    pub fn statuses(&self) -> Vec<StepStatus> {
        self.patches().iter().filter_map(|patch| patch.status).collect()
    }

    pub fn step(&self) -> ExecutionStep {
        self.state.lock().unwrap().step.clone()
    }
}

#[async_trait]
impl DataClient for InMemoryBackend {
    async fn fetch_flow(&self, flow_id: &str, execution_id: &str) -> Result<FlowData, ClientError> {
        self.state
            .lock()
            .unwrap()
            .flow_calls
            .push((flow_id.to_string(), execution_id.to_string()));
        self.flows
            .get(flow_id)
            .cloned()
            .map(FlowData)
            .ok_or_else(|| ClientError::NotFound {
                kind: "Flow",
                id: flow_id.to_string(),
            })
    }

    async fn fetch_payload(&self, payload_id: &str) -> Result<PayloadData, ClientError> {
        self.state
            .lock()
            .unwrap()
            .payload_calls
            .push(payload_id.to_string());
        self.payloads
            .get(payload_id)
            .cloned()
            .map(PayloadData)
            .ok_or_else(|| ClientError::NotFound {
                kind: "Payload",
                id: payload_id.to_string(),
            })
    }
}

#[async_trait]
impl StepUpdater for InMemoryBackend {
    async fn update_step(&self, execution_id: &str, patch: &StepPatch) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        if self.fail_update_at == Some(state.patches.len()) {
            return Err(ClientError::Unreachable("connection reset".to_string()));
        }
        if patch.id != state.step.id {
            return Err(ClientError::InvalidStep(patch.id.clone()));
        }
        state.step.apply(patch);
        state.patches.push((execution_id.to_string(), patch.clone()));
        let log = state.step.messages.clone();
        state.logs.push(log);
        Ok(())
    }
}

pub fn flow_record() -> Value {
    json!({"id": "F1", "name": "Disk alerts", "active": true})
}

pub fn payload_record() -> Value {
    json!({"id": "P1", "payload": {"alert": "disk full", "host": "db-01"}})
}

/// Backend knowing flow F1 and payload P1
pub fn seeded_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_flow("F1", flow_record())
        .with_payload("P1", payload_record())
}

/// Execute request for step-1 of exec-1 with the given action params
pub fn request_with_params(params: &[(&str, &str)]) -> ActionRequest {
    ActionRequest {
        execution: Execution {
            id: "exec-1".to_string(),
            flow_id: String::new(),
            payload_id: String::new(),
        },
        step: ExecutionStep {
            id: "step-1".to_string(),
            execution_id: "exec-1".to_string(),
            ..ExecutionStep::default()
        },
        action: Action {
            id: "action-1".to_string(),
            params: Some(
                params
                    .iter()
                    .map(|(key, value)| ActionParam {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
            ),
        },
        args: HashMap::new(),
    }
}

pub fn valid_request(log_data: bool) -> ActionRequest {
    request_with_params(&[
        (FLOW_ID_PARAM, "F1"),
        (PAYLOAD_ID_PARAM, "P1"),
        (LOG_DATA_PARAM, if log_data { "true" } else { "false" }),
    ])
}
