//! Client Registry
//!
//! Concurrency-safe set of open reload subscribers, keyed by connection id.
//!
//! A subscriber is in the registry iff its connection is open. Membership is
//! held by a [`Membership`] guard owned by the connection task, so leaving
//! the registry happens on every exit path of that task. The broadcaster may
//! also evict a subscriber whose send failed; the later guard drop is then a
//! no-op.
//!
//! The map lock is only held for insert/remove/clone, never across network
//! I/O: [`ClientRegistry::snapshot`] hands out `Arc`s so the broadcaster can
//! send without blocking registrations.

use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::{Sink, SinkExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tungstenite::protocol::Message;

/// Error type of the send half of a subscriber connection.
pub type WsError = tungstenite::Error;

/// Send half of a subscriber connection.
pub type ReloadSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Unique identity of one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One browser tab subscribed for reloads.
pub struct Subscriber {
    id: ClientId,
    peer: Option<SocketAddr>,
    /// Held only while a frame is in flight to this subscriber.
    sink: tokio::sync::Mutex<ReloadSink>,
    open: AtomicBool,
}

impl Subscriber {
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Send one frame. A failed send marks the subscriber closed.
    pub async fn send(&self, msg: Message) -> Result<(), WsError> {
        if !self.is_open() {
            return Err(WsError::AlreadyClosed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(msg).await.inspect_err(|_| self.mark_closed())
    }

    /// Send a close frame and mark the subscriber closed. Only the first
    /// call sends anything.
    pub async fn close(&self) -> Result<(), WsError> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let mut sink = self.sink.lock().await;
        sink.close().await
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// Set of currently open subscribers.
///
/// Owned by the coordinator and shared by `Arc` with the subscription server
/// and the broadcaster.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<FxHashMap<ClientId, Arc<Subscriber>>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber for `sink`. It stays registered until the returned
    /// guard is dropped or [`unregister`](Self::unregister) is called.
    pub fn register(self: &Arc<Self>, sink: ReloadSink, peer: Option<SocketAddr>) -> Membership {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber {
            id,
            peer,
            sink: tokio::sync::Mutex::new(sink),
            open: AtomicBool::new(true),
        });

        let total = {
            let mut clients = self.clients.lock();
            clients.insert(id, Arc::clone(&subscriber));
            clients.len()
        };
        crate::debug!("reload"; "client {} subscribed (total: {})", id, total);

        Membership {
            registry: Arc::clone(self),
            subscriber,
        }
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unregister(&self, id: ClientId) -> bool {
        let (removed, total) = {
            let mut clients = self.clients.lock();
            let removed = clients.remove(&id);
            (removed, clients.len())
        };

        match removed {
            Some(subscriber) => {
                subscriber.mark_closed();
                crate::debug!("reload"; "client {} unsubscribed (total: {})", id, total);
                true
            }
            None => false,
        }
    }

    /// Current subscribers, for iteration without holding the lock.
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.clients.lock().values().cloned().collect()
    }

    #[cfg(test)]
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().contains_key(&id)
    }

    /// Ids of current subscribers, sorted.
    #[cfg(test)]
    pub fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self.clients.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

/// Scoped registry membership of one connection.
///
/// Dropping it unregisters the subscriber, whatever the reason the
/// connection ended.
#[must_use = "dropping the membership unregisters the subscriber immediately"]
pub struct Membership {
    registry: Arc<ClientRegistry>,
    subscriber: Arc<Subscriber>,
}

impl Membership {
    #[cfg(test)]
    pub fn id(&self) -> ClientId {
        self.subscriber.id
    }

    pub fn subscriber(&self) -> &Arc<Subscriber> {
        &self.subscriber
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.subscriber.mark_closed();
        self.registry.unregister(self.subscriber.id);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::channel_sink;
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_register_and_drop_membership() {
        let registry = Arc::new(ClientRegistry::new());
        let (sink, _rx) = channel_sink();

        let membership = registry.register(sink, None);
        let id = membership.id();
        assert!(registry.contains(id));
        assert!(membership.subscriber().is_open());

        let subscriber = Arc::clone(membership.subscriber());
        drop(membership);
        assert!(!registry.contains(id));
        assert!(!subscriber.is_open());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = Arc::new(ClientRegistry::new());
        let (sink, _rx) = channel_sink();
        let membership = registry.register(sink, None);
        let id = membership.id();

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        // guard drop after explicit removal does nothing
        drop(membership);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = Arc::new(ClientRegistry::new());
        let members: Vec<_> = (0..16)
            .map(|_| registry.register(channel_sink().0, None))
            .collect();

        let ids: BTreeSet<_> = members.iter().map(Membership::id).collect();
        assert_eq!(ids.len(), 16);
        assert_eq!(registry.len(), 16);
    }

    #[test]
    fn test_snapshot_is_detached_from_registry() {
        let registry = Arc::new(ClientRegistry::new());
        let a = registry.register(channel_sink().0, None);
        let b = registry.register(channel_sink().0, None);

        let snapshot = registry.snapshot();
        drop(a);
        let _c = registry.register(channel_sink().0, None);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(b.id()));
    }

    #[test]
    fn test_concurrent_register_unregister_keeps_exact_membership() {
        let registry = Arc::new(ClientRegistry::new());

        // Each thread registers 50 subscribers and releases every other one,
        // while snapshots run concurrently on another thread.
        let kept: Vec<Vec<Membership>> = std::thread::scope(|scope| {
            let snapshotter = scope.spawn(|| {
                for _ in 0..200 {
                    let _ = registry.snapshot();
                }
            });

            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let registry = &registry;
                    scope.spawn(move || {
                        let mut kept = Vec::new();
                        for i in 0..50 {
                            let membership = registry.register(channel_sink().0, None);
                            if i % 2 == 0 {
                                kept.push(membership);
                            }
                        }
                        kept
                    })
                })
                .collect();

            snapshotter.join().unwrap();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let mut expected: Vec<_> = kept.iter().flatten().map(Membership::id).collect();
        expected.sort_unstable();
        assert_eq!(registry.ids(), expected);
        assert_eq!(registry.len(), 8 * 25);

        drop(kept);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_membership_exact_under_concurrent_broadcasts() {
        use crate::reload::broadcast::Broadcaster;

        let registry = Arc::new(ClientRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        // Workers register live tabs, release some of them, and register
        // tabs whose receiver is already gone, while broadcasts keep running.
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let mut live = Vec::new();
                    let mut dead = Vec::new();
                    for i in 0..60 {
                        let (sink, rx) = channel_sink();
                        let membership = registry.register(sink, None);
                        match i % 3 {
                            0 => drop(membership),
                            1 => live.push((membership, rx)),
                            _ => {
                                drop(rx);
                                dead.push(membership);
                            }
                        }
                        std::thread::yield_now();
                    }
                    (live, dead)
                })
            })
            .collect();

        while !workers.iter().all(std::thread::JoinHandle::is_finished) {
            broadcaster.broadcast_reload().await;
            tokio::task::yield_now().await;
        }
        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        // dead tabs registered after the last broadcast are evicted here
        let report = broadcaster.broadcast_reload().await;

        let mut expected: Vec<_> = results
            .iter()
            .flat_map(|(live, _)| live.iter().map(|(m, _)| m.id()))
            .collect();
        expected.sort_unstable();
        assert_eq!(registry.ids(), expected);
        assert_eq!(report.delivered, 4 * 20);

        for (live, dead) in &results {
            assert!(live.iter().all(|(m, _)| m.subscriber().is_open()));
            assert!(dead.iter().all(|m| !m.subscriber().is_open()));
        }

        drop(results);
        assert!(registry.is_empty());
    }
}
