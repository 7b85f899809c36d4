//! Server configuration management for `reloadd.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [serve] [reload] [tls] [watch]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # config file discovery
//! └── mod.rs         # DevConfig (this file)
//! ```
//!
//! Precedence: CLI flag > config file > built-in default. The config file is
//! optional; without one every value comes from flags or defaults.

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{ReloadConfig, ServeConfig, TlsConfig, WatchConfig};

use crate::cli::Cli;
use crate::log;
use crate::utils::path::{normalize_path, resolve_against};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing reloadd.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Content endpoint
    #[serde(default)]
    pub serve: ServeConfig,

    /// Subscription endpoint
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Certificate and key
    #[serde(default)]
    pub tls: TlsConfig,

    /// Watched directory
    #[serde(default)]
    pub watch: WatchConfig,
}

impl DevConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; a missing file is not an
    /// error. All paths in the result are absolute and validated.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.resolve_paths(&base);
                config.config_path = Some(path);
                config
            }
            None => {
                let mut config = Self::default();
                config.resolve_paths(&cwd);
                config
            }
        };

        config.apply_cli(cli, &cwd);
        config.validate()?;
        config.watch.root = normalize_path(&config.watch.root);

        Ok(config)
    }

    /// Parse configuration from TOML string
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Make every configured path absolute against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        self.tls.cert = resolve_against(&self.tls.cert, base);
        self.tls.key = resolve_against(&self.tls.key, base);
        self.watch.root = resolve_against(&self.watch.root, base);
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply CLI overrides. Paths given on the command line are cwd-relative.
    fn apply_cli(&mut self, cli: &Cli, cwd: &Path) {
        Self::update_option(&mut self.serve.interface, cli.interface.as_ref());
        Self::update_option(&mut self.serve.port, cli.port.as_ref());
        Self::update_option(&mut self.reload.port, cli.reload_port.as_ref());
        Self::update_option(&mut self.watch.debounce_ms, cli.debounce.as_ref());

        if let Some(cert) = &cli.cert {
            self.tls.cert = resolve_against(cert, cwd);
        }
        if let Some(key) = &cli.key {
            self.tls.key = resolve_against(key, cwd);
        }
        if let Some(root) = &cli.root {
            self.watch.root = resolve_against(root, cwd);
        }
    }

    /// Update config option if CLI value is provided.
    #[inline]
    fn update_option<T: Clone>(target: &mut T, value: Option<&T>) {
        if let Some(v) = value {
            *target = v.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate startup requirements. Every failure here is fatal.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if !self.tls.cert.is_file() {
            diag.error_with_hint(
                "tls.cert",
                format!("certificate file `{}` not found", self.tls.cert.display()),
                "set [tls] cert or pass --cert",
            );
        }
        if !self.tls.key.is_file() {
            diag.error_with_hint(
                "tls.key",
                format!("private key file `{}` not found", self.tls.key.display()),
                "set [tls] key or pass --key",
            );
        }
        if !self.watch.root.is_dir() {
            diag.error(
                "watch.root",
                format!("watch directory `{}` does not exist", self.watch.root.display()),
            );
        }
        if self.serve.port != 0 && self.serve.port == self.reload.port {
            diag.error_with_hint(
                "reload.port",
                format!("reload port {} collides with serve.port", self.reload.port),
                "pick distinct ports for content and reload endpoints",
            );
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Address of the subscription endpoint.
    pub fn reload_addr(&self) -> SocketAddr {
        SocketAddr::new(self.serve.interface, self.reload.port)
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> DevConfig {
    let (parsed, ignored) = DevConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Valid config rooted in `dir`: empty cert/key files, ephemeral ports.
#[cfg(test)]
pub fn test_config_in(dir: &Path) -> DevConfig {
    fs::write(dir.join("cert.pem"), "").unwrap();
    fs::write(dir.join("key.pem"), "").unwrap();

    let mut config = DevConfig::default();
    config.resolve_paths(dir);
    config.serve.port = 0;
    config.reload.port = 0;
    config
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = DevConfig::from_str("[serve\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[serve]\nport = 4443\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = DevConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.serve.port, 4443);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_resolve_paths_relative_to_base() {
        let mut config = test_parse_config("[tls]\ncert = \"c.pem\"\nkey = \"/abs/k.pem\"");
        config.resolve_paths(Path::new("/site"));

        assert_eq!(config.tls.cert, Path::new("/site/c.pem"));
        assert_eq!(config.tls.key, Path::new("/abs/k.pem"));
        assert_eq!(config.watch.root, Path::new("/site/."));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let cli = Cli::parse_from([
            "reloadd",
            "public",
            "--port",
            "9443",
            "--reload-port",
            "9765",
            "--cert",
            "dev.crt",
            "--debounce",
            "120",
        ]);
        let mut config = test_parse_config("[serve]\nport = 1\n[reload]\nport = 2");
        config.apply_cli(&cli, Path::new("/work"));

        assert_eq!(config.serve.port, 9443);
        assert_eq!(config.reload.port, 9765);
        assert_eq!(config.tls.cert, Path::new("/work/dev.crt"));
        assert_eq!(config.watch.root, Path::new("/work/public"));
        assert_eq!(config.watch.debounce_ms, 120);
        // untouched
        assert_eq!(config.tls.key, Path::new("key.pem"));
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config_in(dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config_in(dir.path());
        config.tls.cert = dir.path().join("missing-cert.pem");
        config.watch.root = dir.path().join("missing-root");

        let err = config.validate().unwrap_err();
        let Some(ConfigError::Diagnostics(diag)) = err.downcast_ref::<ConfigError>() else {
            panic!("expected diagnostics, got {err:?}");
        };
        let fields: Vec<_> = diag.errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["tls.cert", "watch.root"]);
        assert!(err.to_string().contains("missing-cert.pem"));
    }

    #[test]
    fn test_validate_port_collision() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config_in(dir.path());
        config.serve.port = 8765;
        config.reload.port = 8765;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("collides"));
    }
}
