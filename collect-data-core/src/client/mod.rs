//! Client side of the backend API: flow and payload lookups.

use crate::models::{FlowData, PayloadData};
use async_trait::async_trait;
use thiserror::Error;

pub mod backend_client;

pub use backend_client::BackendClient;

/// Failures of a single backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid backend client configuration: {0}")]
    InvalidConfiguration(String),
}

/// Read access to the records an action needs.
///
/// Implementations must not retry; a failed call is reported as-is.
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Fetch a flow definition in the context of an execution
    async fn fetch_flow(&self, flow_id: &str, execution_id: &str) -> Result<FlowData, ClientError>;

    /// Fetch a payload record
    async fn fetch_payload(&self, payload_id: &str) -> Result<PayloadData, ClientError>;
}
