//! Wire protocol between the runner and the plugin
//!
//! Newline-delimited JSON: one handshake line, then one request per line,
//! each answered by exactly one response line.

pub mod handshake;
pub mod messages;

pub use handshake::*;
pub use messages::*;

use thiserror::Error;

/// Errors at the process boundary
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Invalid data for '{action}' request: {reason}")]
    InvalidData { action: String, reason: String },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("Handshake failed: magic cookie mismatch")]
    MagicCookieMismatch,

    #[error("Handshake failed: protocol version {actual} not supported (expected {expected})")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Input closed before handshake")]
    MissingHandshake,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Whether the process must stop serving after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::UnknownAction(_))
    }

    /// Whether the error comes from a failed handshake
    pub fn is_handshake(&self) -> bool {
        matches!(
            self,
            ProtocolError::MagicCookieMismatch
                | ProtocolError::VersionMismatch { .. }
                | ProtocolError::MissingHandshake
        )
    }
}
