//! Startup handshake

use crate::protocol::ProtocolError;
use serde::{Deserialize, Serialize};

/// First line sent by the runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    pub magic_cookie: String,
    pub protocol_version: u32,
}

impl Handshake {
    /// Check the runner's handshake against what this plugin expects
    pub fn verify(&self, magic_cookie: &str, protocol_version: u32) -> Result<(), ProtocolError> {
        if self.magic_cookie != magic_cookie {
            return Err(ProtocolError::MagicCookieMismatch);
        }
        if self.protocol_version != protocol_version {
            return Err(ProtocolError::VersionMismatch {
                expected: protocol_version,
                actual: self.protocol_version,
            });
        }
        Ok(())
    }
}

/// Plugin answer to an accepted handshake
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeAck {
    pub success: bool,
    pub protocol_version: u32,
    pub plugin: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake(cookie: &str, version: u32) -> Handshake {
        Handshake {
            magic_cookie: cookie.to_string(),
            protocol_version: version,
        }
    }

    #[test]
    fn test_matching_handshake() {
        assert!(handshake("secret", 1).verify("secret", 1).is_ok());
    }

    #[test]
    fn test_cookie_mismatch() {
        let err = handshake("wrong", 1).verify("secret", 1).unwrap_err();
        assert!(matches!(err, ProtocolError::MagicCookieMismatch));
        assert!(err.is_handshake());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_version_mismatch() {
        let err = handshake("secret", 2).verify("secret", 1).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::VersionMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_handshake_ignores_unknown_fields() {
        let parsed: Handshake = serde_json::from_str(
            r#"{"magic_cookie":"secret","protocol_version":1,"runner":"0.9"}"#,
        )
        .unwrap();
        assert_eq!(parsed, handshake("secret", 1));
    }
}
