//! Utility modules shared by the content responder and the watcher.

pub mod html;
pub mod mime;
pub mod path;
