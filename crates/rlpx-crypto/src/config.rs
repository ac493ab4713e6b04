//! Session configuration.

use rlpx_core::MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};

/// Tunables for a session connection.
///
/// Every field has a default, so partial configs deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Largest EIP-8 handshake packet accepted, prefix included.
    pub max_handshake_packet: usize,
    /// Random zero padding appended to outgoing handshake messages.
    pub min_handshake_padding: usize,
    pub max_handshake_padding: usize,
    /// Snappy-compress message payloads. Both peers must agree.
    pub compression: bool,
    /// Largest message payload written, or accepted after decompression.
    pub max_message_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_handshake_packet: 2048,
            min_handshake_padding: 100,
            max_handshake_padding: 300,
            compression: false,
            max_message_size: MAX_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"compression": true}"#).unwrap();
        assert!(config.compression);
        assert_eq!(config.max_handshake_packet, 2048);
        assert_eq!(config.max_message_size, MAX_FRAME_SIZE);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = SessionConfig {
            min_handshake_padding: 0,
            max_handshake_padding: 0,
            ..SessionConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<SessionConfig>(&json).unwrap(), config);
    }
}
