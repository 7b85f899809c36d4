//! Actor Message Definitions
//!
//! ```text
//! FsWatcher --Change--> WsActor
//! ```

use crate::reload::event::ChangeEvent;

/// Messages to WebSocket Actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMsg {
    /// A watched file changed; reload subscribers
    Change(ChangeEvent),
    /// Close every subscriber and stop
    Shutdown,
}
