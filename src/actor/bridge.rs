//! Cross-Context Event Bridge
//!
//! The watcher runs on notify's own thread, the broadcaster on the tokio
//! context. The bridge is the only way across: `notify` pushes onto an
//! unbounded queue and returns at once, and [`WsActor`](super::ws::WsActor)
//! drains the queue in order on its own context.
//!
//! Broadcasts are dispatch-ordered: they start in `notify` order, but
//! `notify` never waits for an earlier broadcast to finish.

use tokio::sync::mpsc;

use super::messages::WsMsg;
use crate::reload::event::ChangeEvent;

/// Sending half of the bridge. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct ReloadBridge {
    tx: mpsc::UnboundedSender<WsMsg>,
}

impl ReloadBridge {
    /// Create the bridge and the queue the broadcast actor drains.
    ///
    /// Events sent before the actor starts are kept until it does.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WsMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Schedule a reload for `event`. Never blocks, never fails.
    ///
    /// Directory events are dropped here. Returns whether a broadcast was
    /// scheduled; `false` once the broadcast side has shut down.
    pub fn notify(&self, event: ChangeEvent) -> bool {
        if event.is_dir {
            crate::debug!("watch"; "skip directory {}: {}", event.kind.label(), event.path.display());
            return false;
        }

        crate::debug!("watch"; "{}: {}", event.kind.label(), event.path.display());
        self.send(WsMsg::Change(event))
    }

    /// Ask the broadcast actor to close all subscribers and stop.
    pub fn shutdown(&self) -> bool {
        self.send(WsMsg::Shutdown)
    }

    fn send(&self, msg: WsMsg) -> bool {
        match self.tx.send(msg) {
            Ok(()) => true,
            Err(mpsc::error::SendError(msg)) => {
                crate::debug!("watch"; "reload context gone, dropped {:?}", msg);
                false
            }
        }
    }
}
