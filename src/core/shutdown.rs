//! Shutdown fan-out for serve mode.
//!
//! One `Shutdown` per process run, owned by the coordinator and shared by
//! `Arc`. Triggering it:
//! - flips the flag polled by the content server's request handlers
//! - wakes every cooperative task waiting on [`Shutdown::subscribe`]
//! - unblocks the content server's blocking accept loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;
use tokio::sync::watch;

pub struct Shutdown {
    requested: AtomicBool,
    tx: watch::Sender<bool>,
    /// HTTP server to unblock, registered once it is bound
    server: OnceLock<Arc<Server>>,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        let (tx, _) = watch::channel(false);
        Arc::new(Self {
            requested: AtomicBool::new(false),
            tx,
            server: OnceLock::new(),
        })
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        self.tx.send_replace(true);
        if let Some(server) = self.server.get() {
            server.unblock();
        }
    }

    /// Check if shutdown has been requested
    ///
    /// Uses Relaxed ordering - worst case one more request is served
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    /// Receiver that observes `true` once shutdown is triggered.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Register the HTTP server for graceful shutdown
    ///
    /// Call this after binding the server, before entering the request loop
    pub fn register_server(&self, server: Arc<Server>) {
        let server = self.server.get_or_init(|| server);
        // trigger() may have run before the server existed
        if self.is_requested() {
            server.unblock();
        }
    }

    pub fn has_server(&self) -> bool {
        self.server.get().is_some()
    }
}

/// Setup the Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether a server has been registered:
/// - Before `register_server()`: exit immediately, nothing to drain
/// - After `register_server()`: graceful shutdown
pub fn install_ctrlc_handler(shutdown: Arc<Shutdown>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if shutdown.has_server() {
            crate::log!("serve"; "shutting down...");
            shutdown.trigger();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_observed_by_subscribers() {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        assert!(!shutdown.is_requested());
        assert!(!*rx.borrow());

        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_requested());
        assert!(*rx.borrow());
    }

    #[test]
    fn test_late_subscriber_sees_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(*shutdown.subscribe().borrow());
    }

    #[tokio::test]
    async fn test_wait_for_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        let waiter = tokio::spawn(async move { rx.wait_for(|stop| *stop).await.is_ok() });
        tokio::task::yield_now().await;
        shutdown.trigger();
        assert!(waiter.await.unwrap());
    }

    #[test]
    fn test_register_server_after_trigger_unblocks() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        shutdown.register_server(Arc::clone(&server));
        assert!(shutdown.has_server());
        // unblocked: the request loop ends immediately
        assert!(server.incoming_requests().next().is_none());
    }
}
