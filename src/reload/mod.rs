//! Reload Module
//!
//! WebSocket-based live reload: who is subscribed, and how a reload reaches
//! them.
//!
//! # Architecture
//!
//! ```text
//! notify thread ──ChangeEvent──> bridge queue ──> WsActor ──> Broadcaster ──> Subscribers
//!   (actor::fs)                  (actor::bridge)  (actor::ws)                  (registry)
//!                                                                   ^
//!                                      ReloadServer ──register──────┘
//! ```
//!
//! # Modules
//!
//! - `event` - Change events produced by the filesystem watcher
//! - `message` - The `reload` wire message
//! - `registry` - Concurrency-safe set of open subscriber connections
//! - `broadcast` - Parallel fan-out of a message to a registry snapshot
//! - `debounce` - Optional coalescing window for event bursts
//! - `server` - TLS WebSocket endpoint that browsers subscribe on

pub mod broadcast;
pub mod debounce;
pub mod event;
pub mod message;
pub mod registry;
pub mod server;
