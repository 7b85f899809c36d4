//! Coalescing window for change bursts.
//!
//! Disabled by default: every change triggers its own broadcast. With a
//! window configured, changes are collected per path until no new change
//! arrived for the whole window, then flushed as one batch.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::event::{ChangeEvent, ChangeKind};

/// Pure debouncer: timing and per-path dedup, nothing else.
pub struct Debouncer {
    window: Duration,
    /// Path → ChangeKind (dedup is free via key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Add a change, applying dedup rules:
    /// - Removed → Created/Modified: restored, use the new kind
    /// - Modified → Removed: deleted, upgrade to Removed
    /// - Created → Removed: appeared then vanished, discard
    /// - otherwise: first event wins
    ///
    /// Every call restarts the window, even when the change is deduped.
    pub fn record(&mut self, event: &ChangeEvent) {
        self.last_event = Some(Instant::now());

        let Some(&existing) = self.changes.get(&event.path) else {
            self.changes.insert(event.path.clone(), event.kind);
            return;
        };

        match (existing, event.kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                crate::debug!("watch"; "restore removed->{}: {}", event.kind.label(), event.path.display());
                self.changes.insert(event.path.clone(), event.kind);
            }
            (ChangeKind::Modified, ChangeKind::Removed) => {
                crate::debug!("watch"; "upgrade modified->removed: {}", event.path.display());
                self.changes.insert(event.path.clone(), ChangeKind::Removed);
            }
            (ChangeKind::Created, ChangeKind::Removed) => {
                crate::debug!("watch"; "discard created+removed: {}", event.path.display());
                self.changes.remove(&event.path);
            }
            _ => {}
        }
    }

    /// Take the pending batch once the window has elapsed since the last
    /// change. Sorted by path.
    pub fn take_if_ready(&mut self) -> Option<Vec<ChangeEvent>> {
        let last_event = self.last_event?;
        if last_event.elapsed() < self.window {
            return None;
        }

        self.last_event = None;
        let mut batch: Vec<_> = std::mem::take(&mut self.changes)
            .into_iter()
            .map(|(path, kind)| ChangeEvent::file(path, kind))
            .collect();

        if batch.is_empty() {
            return None;
        }
        batch.sort_by(|a, b| a.path.cmp(&b.path));
        Some(batch)
    }

    /// True while a window is open, even if every change in it cancelled out.
    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// Precise sleep duration until the window closes.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}
