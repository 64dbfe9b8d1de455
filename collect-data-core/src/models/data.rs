//! Records fetched from the backend

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flow definition as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FlowData(pub Value);

/// Payload (alert) record as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PayloadData(pub Value);
