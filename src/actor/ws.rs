//! WebSocket Actor - Reload Broadcasting
//!
//! Drains the bridge queue on the cooperative context and turns each change
//! into a broadcast. Without a debounce window every file change is its own
//! broadcast; with one, a burst collapses into a single broadcast.
//!
//! ```text
//! ReloadBridge --WsMsg--> WsActor --broadcast_reload--> Subscribers
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use super::messages::WsMsg;
use crate::logger::status_success;
use crate::reload::broadcast::{BroadcastReport, Broadcaster};
use crate::reload::debounce::Debouncer;
use crate::reload::event::ChangeEvent;

/// WebSocket Actor - owns the receiving end of the bridge
pub struct WsActor {
    /// Channel to receive messages
    rx: mpsc::UnboundedReceiver<WsMsg>,
    broadcaster: Broadcaster,
    /// `None` = one broadcast per change
    debouncer: Option<Debouncer>,
    /// Watched root, for short paths in the status line
    root: PathBuf,
}

impl WsActor {
    pub fn new(
        rx: mpsc::UnboundedReceiver<WsMsg>,
        broadcaster: Broadcaster,
        debounce: Option<Duration>,
        root: PathBuf,
    ) -> Self {
        Self {
            rx,
            broadcaster,
            debouncer: debounce.map(Debouncer::new),
            root,
        }
    }

    /// Run the actor event loop until `Shutdown` or the bridge is dropped.
    pub async fn run(mut self) {
        loop {
            let pending = self.debouncer.as_ref().is_some_and(Debouncer::is_pending);
            let sleep = self
                .debouncer
                .as_ref()
                .map_or(Duration::from_secs(86400), Debouncer::sleep_duration);

            tokio::select! {
                biased;
                msg = self.rx.recv() => match msg {
                    Some(WsMsg::Change(event)) => self.on_change(event).await,
                    Some(WsMsg::Shutdown) | None => break,
                },
                _ = tokio::time::sleep(sleep), if pending => self.flush().await,
            }
        }

        crate::debug!("ws"; "shutting down");
        self.broadcaster.close_all().await;
    }

    async fn on_change(&mut self, event: ChangeEvent) {
        if event.is_dir {
            return;
        }

        match self.debouncer.as_mut() {
            Some(debouncer) => debouncer.record(&event),
            None => {
                let report = self.broadcaster.broadcast_reload().await;
                self.report(&report, &self.short_path(&event.path));
            }
        }
    }

    /// Broadcast once for the whole pending batch, if the window closed.
    async fn flush(&mut self) {
        let Some(batch) = self.debouncer.as_mut().and_then(Debouncer::take_if_ready) else {
            return;
        };

        let summary = match batch.as_slice() {
            [single] => self.short_path(&single.path),
            [first, rest @ ..] => format!("{} +{}", self.short_path(&first.path), rest.len()),
            [] => return,
        };
        let report = self.broadcaster.broadcast_reload().await;
        self.report(&report, &summary);
    }

    fn report(&self, report: &BroadcastReport, what: &str) {
        if report.attempted() == 0 {
            crate::debug!("ws"; "{} changed, no clients", what);
            return;
        }

        status_success(&reload_status(report, what));
    }

    fn short_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Status line for one broadcast, e.g. `reload → 2 clients, 1 dropped (index.html)`.
fn reload_status(report: &BroadcastReport, what: &str) -> String {
    let plural = if report.delivered == 1 { "" } else { "s" };
    let dropped = match report.dropped {
        0 => String::new(),
        n => format!(", {n} dropped"),
    };
    format!("reload → {} client{plural}{dropped} ({what})", report.delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::bridge::ReloadBridge;
    use crate::reload::event::ChangeKind;
    use crate::reload::message::ReloadSignal;
    use crate::reload::registry::ClientRegistry;
    use crate::reload::registry::testing::channel_sink;
    use futures::StreamExt;
    use std::sync::Arc;

    fn spawn_actor(
        debounce: Option<Duration>,
    ) -> (ReloadBridge, Arc<ClientRegistry>, tokio::task::JoinHandle<()>) {
        let (bridge, rx) = ReloadBridge::channel();
        let registry = Arc::new(ClientRegistry::new());
        let actor = WsActor::new(
            rx,
            Broadcaster::new(Arc::clone(&registry)),
            debounce,
            PathBuf::from("/site"),
        );
        (bridge, registry, tokio::spawn(actor.run()))
    }

    fn modified(name: &str) -> ChangeEvent {
        ChangeEvent::file(format!("/site/{name}"), ChangeKind::Modified)
    }

    #[tokio::test]
    async fn test_one_reload_per_change() {
        let (bridge, registry, actor) = spawn_actor(None);
        let (sink, mut rx) = channel_sink();
        let _a = registry.register(sink, None);

        bridge.notify(modified("index.html"));
        bridge.notify(modified("style.css"));
        bridge.shutdown();
        actor.await.unwrap();

        let frames: Vec<_> = rx.collect().await;
        let reloads = frames.iter().filter(|m| ReloadSignal::matches(m)).count();
        assert_eq!(reloads, 2);
    }

    #[tokio::test]
    async fn test_notify_without_subscribers() {
        let (bridge, registry, actor) = spawn_actor(None);

        assert!(bridge.notify(modified("index.html")));
        bridge.shutdown();
        actor.await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_tab_gets_nothing_more() {
        let (bridge, registry, actor) = spawn_actor(None);
        let (sink, mut rx) = channel_sink();
        let a = registry.register(sink, None);

        bridge.notify(modified("index.html"));
        let first = rx.next().await.unwrap();
        assert!(ReloadSignal::matches(&first));

        drop(a);
        bridge.notify(modified("index.html"));
        bridge.shutdown();
        actor.await.unwrap();

        // channel closed without further frames
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_debounce_coalesces_burst() {
        let (bridge, registry, actor) = spawn_actor(Some(Duration::from_millis(30)));
        let (sink, mut rx) = channel_sink();
        let _a = registry.register(sink, None);

        bridge.notify(modified("index.html"));
        bridge.notify(modified("index.html"));
        bridge.notify(modified("style.css"));

        let first = tokio::time::timeout(Duration::from_secs(2), rx.next())
            .await
            .unwrap()
            .unwrap();
        assert!(ReloadSignal::matches(&first));

        // window has flushed; nothing else queued
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_next().is_err());

        bridge.shutdown();
        actor.await.unwrap();
    }

    #[test]
    fn test_reload_status_mentions_dropped() {
        let all_failed = BroadcastReport { delivered: 0, dropped: 2 };
        assert_eq!(
            reload_status(&all_failed, "index.html"),
            "reload → 0 clients, 2 dropped (index.html)"
        );

        let clean = BroadcastReport { delivered: 1, dropped: 0 };
        assert_eq!(reload_status(&clean, "a.css"), "reload → 1 client (a.css)");
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscribers() {
        let (bridge, registry, actor) = spawn_actor(None);
        let (sink, _rx) = channel_sink();
        let a = registry.register(sink, None);

        bridge.shutdown();
        actor.await.unwrap();
        assert!(!a.subscriber().is_open());
    }
}
