//! Reload wire message.
//!
//! The protocol has a single server-to-client message: a text frame
//! containing `reload`. Clients never send anything meaningful.

use tungstenite::protocol::Message;

/// Text payload of the reload frame.
pub const RELOAD: &str = "reload";

/// Stateless broadcast message telling a tab to reload itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReloadSignal;

impl ReloadSignal {
    pub fn to_message(self) -> Message {
        Message::text(RELOAD)
    }

    /// True if `msg` is a reload frame.
    #[cfg(test)]
    pub fn matches(msg: &Message) -> bool {
        matches!(msg, Message::Text(text) if text.as_str() == RELOAD)
    }
}
