//! FileSystem Watcher
//!
//! Watches the served root recursively on notify's own thread and hands one
//! [`ChangeEvent`] per affected path to the bridge.
//!
//! ```text
//! notify thread → classify → ReloadBridge::notify
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::bridge::ReloadBridge;
use crate::config::WatchConfig;
use crate::reload::event::{ChangeEvent, ChangeKind};
use crate::utils::path::is_temp_file;

/// FileSystem watcher handle. Watching stops when it is dropped.
pub struct FsWatcher {
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FsWatcher {
    /// Start watching `config.root`. A missing root is a startup fault.
    pub fn start(config: &WatchConfig, bridge: ReloadBridge) -> Result<Self> {
        let root = config.root.clone();
        if !root.is_dir() {
            bail!("watch directory `{}` does not exist", root.display());
        }

        let ignore_editor_files = config.ignore_editor_files;
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for change in classify(&event, ignore_editor_files) {
                        bridge.notify(change);
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        crate::debug!("watch"; "watching {}", root.display());

        Ok(Self {
            _watcher: watcher,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Turn a raw notify event into change events, one per path.
///
/// Metadata-only changes (mtime/atime/chmod noise) and access events are
/// dropped. Directory events are kept but flagged; the bridge discards them.
pub fn classify(event: &notify::Event, ignore_editor_files: bool) -> Vec<ChangeEvent> {
    let (kind, dir_hint) = match event.kind {
        EventKind::Create(create) => (
            ChangeKind::Created,
            match create {
                CreateKind::Folder => Some(true),
                CreateKind::File => Some(false),
                _ => None,
            },
        ),
        EventKind::Remove(remove) => (
            ChangeKind::Removed,
            match remove {
                RemoveKind::Folder => Some(true),
                RemoveKind::File => Some(false),
                _ => None,
            },
        ),
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => (ChangeKind::Modified, None),
        _ => return Vec::new(),
    };

    crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

    event
        .paths
        .iter()
        .filter(|path| !(ignore_editor_files && is_temp_file(path)))
        .map(|path| ChangeEvent {
            path: path.clone(),
            kind,
            is_dir: dir_hint.unwrap_or_else(|| path.is_dir()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind};
    use std::fs;
    use std::time::Duration;

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_classify_file_write() {
        let raw = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/site/index.html"],
        );
        assert_eq!(
            classify(&raw, true),
            vec![ChangeEvent::file("/site/index.html", ChangeKind::Modified)]
        );
    }

    #[test]
    fn test_classify_folder_events_are_flagged() {
        let created = event(EventKind::Create(CreateKind::Folder), &["/site/new"]);
        let removed = event(EventKind::Remove(RemoveKind::Folder), &["/site/old"]);

        assert_eq!(
            classify(&created, true),
            vec![ChangeEvent::dir("/site/new", ChangeKind::Created)]
        );
        assert_eq!(
            classify(&removed, true),
            vec![ChangeEvent::dir("/site/old", ChangeKind::Removed)]
        );
    }

    #[test]
    fn test_classify_one_event_per_path() {
        let rename = event(
            EventKind::Modify(ModifyKind::Name(notify::event::RenameMode::Both)),
            &["/site/a.html", "/site/b.html"],
        );
        assert_eq!(classify(&rename, true).len(), 2);
    }

    #[test]
    fn test_classify_ignores_noise() {
        let metadata = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/site/a.html"],
        );
        let access = event(EventKind::Access(AccessKind::Any), &["/site/a.html"]);
        assert!(classify(&metadata, true).is_empty());
        assert!(classify(&access, true).is_empty());
    }

    #[test]
    fn test_classify_editor_files() {
        let swap = event(EventKind::Create(CreateKind::File), &["/site/.index.html.swp"]);
        assert!(classify(&swap, true).is_empty());
        assert_eq!(classify(&swap, false).len(), 1);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig {
            root: dir.path().join("missing"),
            ..WatchConfig::default()
        };
        let (bridge, _rx) = ReloadBridge::channel();

        let err = FsWatcher::start(&config, bridge).err().unwrap();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_file_write_reaches_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config = WatchConfig {
            root: root.clone(),
            ..WatchConfig::default()
        };
        let (bridge, mut rx) = ReloadBridge::channel();
        let watcher = FsWatcher::start(&config, bridge).unwrap();
        assert_eq!(watcher.root(), root);

        fs::write(root.join("index.html"), "<p>changed</p>").unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within 5s")
            .unwrap();
        let crate::actor::messages::WsMsg::Change(change) = msg else {
            panic!("expected change, got {msg:?}");
        };
        assert_eq!(change.path.file_name().unwrap(), "index.html");
        assert!(!change.is_dir);
    }

    #[tokio::test]
    async fn test_dotfile_write_reaches_bridge_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config = WatchConfig {
            root: root.clone(),
            ..WatchConfig::default()
        };
        let (bridge, mut rx) = ReloadBridge::channel();
        let _watcher = FsWatcher::start(&config, bridge).unwrap();

        fs::write(root.join(".htaccess"), "Options -Indexes").unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within 5s")
            .unwrap();
        let crate::actor::messages::WsMsg::Change(change) = msg else {
            panic!("expected change, got {msg:?}");
        };
        assert_eq!(change.path.file_name().unwrap(), ".htaccess");
        assert!(!change.is_dir);
    }
}
