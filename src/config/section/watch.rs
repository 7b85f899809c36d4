//! `[watch]` section configuration.
//!
//! ```toml
//! [watch]
//! root = "."                  # Served and watched recursively
//! debounce_ms = 0             # 0 = one reload per raw filesystem event
//! ignore_editor_files = false # Skip swap/backup/dot files
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Watched directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory that is both served and watched.
    pub root: PathBuf,

    /// Coalescing window for bursts of events (editor atomic saves).
    pub debounce_ms: u64,

    /// Drop events for editor artifacts (`.swp`, `~`, dotfiles). Off by
    /// default, so every file change reloads.
    pub ignore_editor_files: bool,
}

impl WatchConfig {
    /// `None` when coalescing is disabled.
    pub fn debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            debounce_ms: 0,
            ignore_editor_files: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_watch_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.watch.root, Path::new("."));
        assert!(config.watch.debounce().is_none());
        assert!(!config.watch.ignore_editor_files);
    }

    #[test]
    fn test_watch_config_debounce() {
        let config = test_parse_config("[watch]\nroot = \"public\"\ndebounce_ms = 150");
        assert_eq!(config.watch.root, Path::new("public"));
        assert_eq!(config.watch.debounce(), Some(Duration::from_millis(150)));
    }

    #[test]
    fn test_watch_config_editor_filter_opt_in() {
        let config = test_parse_config("[watch]\nignore_editor_files = true");
        assert!(config.watch.ignore_editor_files);
    }
}
