//! `[reload]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [reload]
//! port = 8765                 # WSS port browsers subscribe on
//! reconnect_ms = 1000         # Delay before a dropped tab resubscribes
//! ```

use serde::{Deserialize, Serialize};

/// Subscription endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// WSS port number. Binds on `serve.interface`.
    pub port: u16,

    /// Fixed delay before the injected client reconnects after a close.
    pub reconnect_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            port: 8765,
            reconnect_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_reload_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.reload.port, 8765);
        assert_eq!(config.reload.reconnect_ms, 1000);
    }

    #[test]
    fn test_reload_config_partial_override() {
        let config = test_parse_config("[reload]\nport = 9000");
        assert_eq!(config.reload.port, 9000);
        assert_eq!(config.reload.reconnect_ms, 1000);
    }
}
