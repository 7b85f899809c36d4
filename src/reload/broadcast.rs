//! Broadcast Channel
//!
//! Fans one message out to every subscriber in a registry snapshot. Sends
//! run concurrently, so a slow tab does not hold up the others. A failed
//! send drops that subscriber and never fails the broadcast.

use std::sync::Arc;

use futures::future::join_all;
use tungstenite::protocol::Message;

use super::message::ReloadSignal;
use super::registry::ClientRegistry;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Subscribers the frame was written to.
    pub delivered: usize,
    /// Subscribers whose send failed and were unregistered.
    pub dropped: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.dropped
    }
}

/// Sends messages to every registered subscriber.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Tell every open tab to reload.
    pub async fn broadcast_reload(&self) -> BroadcastReport {
        self.broadcast(ReloadSignal.to_message()).await
    }

    /// Send `msg` to the subscribers registered right now.
    ///
    /// Subscribers registering mid-broadcast may or may not receive it.
    pub async fn broadcast(&self, msg: Message) -> BroadcastReport {
        let subscribers = self.registry.snapshot();
        if subscribers.is_empty() {
            crate::debug!("reload"; "no clients connected");
            return BroadcastReport::default();
        }

        let sends = subscribers.iter().map(|subscriber| {
            let msg = msg.clone();
            async move { (subscriber, subscriber.send(msg).await) }
        });

        let mut report = BroadcastReport::default();
        for (subscriber, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    crate::debug!("reload"; "client {} dropped: {}", subscriber.id(), e);
                    self.registry.unregister(subscriber.id());
                    report.dropped += 1;
                }
            }
        }

        crate::debug!(
            "reload";
            "broadcast to {} clients ({} dropped)",
            report.delivered,
            report.dropped
        );
        report
    }

    /// Send a close frame to every subscriber. Used on shutdown.
    pub async fn close_all(&self) {
        let subscribers = self.registry.snapshot();
        let closes = subscribers.iter().map(|subscriber| subscriber.close());
        for (subscriber, result) in subscribers.iter().zip(join_all(closes).await) {
            if let Err(e) = result {
                crate::debug!("reload"; "close {} failed: {}", subscriber.id(), e);
            }
        }
    }
}
