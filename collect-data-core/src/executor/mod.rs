//! Action execution: parameter resolution and the collect data state machine

pub mod action;
pub mod params;

pub use action::*;
pub use params::*;

use crate::client::ClientError;
use crate::reporter::ReportingError;
use std::fmt;
use thiserror::Error;

/// Remote lookup performed by the action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Flow,
    Payload,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Flow => write!(f, "Flow"),
            FetchStage::Payload => write!(f, "Payload"),
        }
    }
}

/// Errors returned by an action execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Missing required parameters: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("Failed to get {stage} Data: {source}")]
    RemoteFetch {
        stage: FetchStage,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Reporting(#[from] ReportingError),
}
