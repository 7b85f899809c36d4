//! Reload Subscription Server
//!
//! TLS WebSocket endpoint browsers connect to. Each accepted connection is
//! handshaken, registered for its lifetime, and otherwise ignored: anything
//! the client sends is discarded.
//!
//! ```text
//! TCP accept ──TLS──> WebSocket handshake ──> register ──> read until close ──> unregister
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tungstenite::protocol::Message;

use super::registry::ClientRegistry;

/// Upper bound for TLS + WebSocket handshakes of one connection.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Connection lifecycle
// =============================================================================

/// Lifecycle of one subscriber connection. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting,
    Subscribed,
    Closed,
}

struct Connection {
    peer: Option<SocketAddr>,
    state: ConnectionState,
}

impl Connection {
    fn new(peer: Option<SocketAddr>) -> Self {
        Self {
            peer,
            state: ConnectionState::Connecting,
        }
    }

    fn advance(&mut self, next: ConnectionState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);
        crate::debug!("reload"; "{}: {:?} -> {:?}", self.label(), self.state, next);
        self.state = next;
    }

    fn label(&self) -> String {
        self.peer
            .map_or_else(|| "client".to_string(), |peer| peer.to_string())
    }
}

// =============================================================================
// Server
// =============================================================================

/// Accepts subscriber connections on a bound TLS port.
pub struct ReloadServer {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    registry: Arc<ClientRegistry>,
}

impl ReloadServer {
    /// Bind the subscription port. Failing to bind is fatal for startup.
    pub async fn bind(
        addr: SocketAddr,
        acceptor: TlsAcceptor,
        registry: Arc<ClientRegistry>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind reload endpoint on {addr}"))?;

        Ok(Self {
            listener,
            acceptor,
            registry,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` flips to true.
    ///
    /// Connection-level failures are logged and never stop the loop.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let conn_shutdown = shutdown.clone();

        loop {
            tokio::select! {
                () = stop_requested(&mut shutdown) => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        crate::debug!("reload"; "connection from {}", peer);
                        tokio::spawn(handle_tls(
                            self.acceptor.clone(),
                            stream,
                            peer,
                            Arc::clone(&self.registry),
                            conn_shutdown.clone(),
                        ));
                    }
                    Err(e) => crate::log!("reload"; "accept error: {}", e),
                },
            }
        }

        crate::debug!("reload"; "server stopped");
    }
}

/// Resolves once shutdown is requested or the sender is gone.
///
/// The `watch::Ref` from `wait_for` is dropped here: it holds a read guard
/// and must not live across an `.await` in a spawned task.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn handle_tls(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<ClientRegistry>,
    shutdown: watch::Receiver<bool>,
) {
    let tls = match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
        Ok(Ok(tls)) => tls,
        Ok(Err(e)) => {
            crate::debug!("reload"; "tls handshake with {} failed: {}", peer, e);
            return;
        }
        Err(_) => {
            crate::debug!("reload"; "tls handshake with {} timed out", peer);
            return;
        }
    };

    serve_connection(tls, Some(peer), registry, shutdown).await;
}

/// Run one subscriber connection over an already secured stream.
///
/// Returns once the client closes, the transport fails, or shutdown is
/// requested. The subscriber is unregistered on every one of those paths.
pub async fn serve_connection<S>(
    stream: S,
    peer: Option<SocketAddr>,
    registry: Arc<ClientRegistry>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut conn = Connection::new(peer);

    let ws = match tokio::time::timeout(HANDSHAKE_TIMEOUT, tokio_tungstenite::accept_async(stream))
        .await
    {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            crate::log!("reload"; "handshake with {} failed: {}", conn.label(), e);
            return;
        }
        Err(_) => {
            crate::log!("reload"; "handshake with {} timed out", conn.label());
            return;
        }
    };

    let (sink, mut incoming) = ws.split();
    let membership = registry.register(Box::pin(sink), peer);
    conn.advance(ConnectionState::Subscribed);

    loop {
        tokio::select! {
            () = stop_requested(&mut shutdown) => {
                if let Err(e) = membership.subscriber().close().await {
                    crate::debug!("reload"; "{} close failed: {}", conn.label(), e);
                }
                break;
            }
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                // clients have nothing to say
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    crate::debug!("reload"; "{} read error: {}", conn.label(), e);
                    break;
                }
            },
        }
    }

    drop(membership);
    conn.advance(ConnectionState::Closed);
}
