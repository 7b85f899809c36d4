//! Configuration section definitions.
//!
//! | Section    | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `[serve]`  | Content endpoint (interface, port)              |
//! | `[reload]` | Subscription endpoint (port, client reconnect)  |
//! | `[tls]`    | Certificate and private key shared by both      |
//! | `[watch]`  | Watched root directory and event coalescing     |

mod reload;
mod serve;
mod tls;
mod watch;

pub use reload::ReloadConfig;
pub use serve::ServeConfig;
pub use tls::TlsConfig;
pub use watch::WatchConfig;
