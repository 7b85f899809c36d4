//! Actor System for Live Reload
//!
//! Message-passing concurrency between the watcher thread and the
//! cooperative reload context:
//!
//! ```text
//! FsWatcher --notify--> ReloadBridge --WsMsg--> WsActor --broadcast--> Subscribers
//! (thread)             (unbounded queue)        (tokio)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types crossing into the cooperative context
//! - `bridge` - Cross-context handoff, callable from any thread
//! - `fs` - File system watcher and event classification
//! - `ws` - Broadcast actor, optionally debounced
//! - `coordinator` - Wires up and runs everything

pub mod bridge;
pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
