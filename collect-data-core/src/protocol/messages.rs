//! Request and response messages

use crate::models::{ActionRequest, PluginDescriptor};
use crate::protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACTION_DETAILS: &str = "details";
pub const ACTION_EXECUTE: &str = "execute";
pub const ACTION_HANDLE_PAYLOAD: &str = "handle_payload";

/// Error text returned for capabilities this plugin does not provide
pub const NOT_IMPLEMENTED: &str = "not implemented";

/// Raw request line as it arrives from the runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Request validated at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Return the plugin descriptor
    Details,
    /// Run the collect data action
    Execute(Box<ActionRequest>),
    /// Payload handler capability, not provided by this action plugin
    HandlePayload(Value),
}

impl Request {
    /// Parse one request line
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(line).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        Self::try_from(envelope)
    }

    /// Name of the request as used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Request::Details => ACTION_DETAILS,
            Request::Execute(_) => ACTION_EXECUTE,
            Request::HandlePayload(_) => ACTION_HANDLE_PAYLOAD,
        }
    }
}

impl TryFrom<Envelope> for Request {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.action.as_str() {
            "details" | "describe" => Ok(Request::Details),
            "execute" => serde_json::from_value::<ActionRequest>(envelope.data)
                .map(|request| Request::Execute(Box::new(request)))
                .map_err(|e| ProtocolError::InvalidData {
                    action: envelope.action.clone(),
                    reason: e.to_string(),
                }),
            "handle_payload" | "unsupported_handler" => Ok(Request::HandlePayload(envelope.data)),
            _ => Err(ProtocolError::UnknownAction(envelope.action)),
        }
    }
}

/// Response line written back to the runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginDescriptor>,
}

impl Response {
    pub fn details(plugin: PluginDescriptor) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            plugin: Some(plugin),
        }
    }

    pub fn data(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            plugin: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            plugin: None,
        }
    }
}
