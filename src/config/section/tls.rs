//! `[tls]` section configuration.
//!
//! ```toml
//! [tls]
//! cert = "cert.pem"
//! key = "key.pem"
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Certificate chain and private key, PEM encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert: PathBuf::from("cert.pem"),
            key: PathBuf::from("key.pem"),
        }
    }
}
