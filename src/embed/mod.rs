//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server templates (reload.js)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{RELOAD_JS, ReloadVars};
//!
//! let js = RELOAD_JS.render(&ReloadVars { port: 8765, retry_ms: 1000 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Variables for reload.js.
    #[derive(Debug, Clone, Copy)]
    pub struct ReloadVars {
        /// Subscription endpoint port
        pub port: u16,
        /// Delay before reconnecting after the socket closes
        pub retry_ms: u64,
    }

    impl TemplateVars for ReloadVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__RELOAD_PORT__", &self.port.to_string())
                .replace("__RETRY_MS__", &self.retry_ms.to_string())
        }
    }

    /// Client bootstrap: subscribe over `wss://`, reload on signal, reconnect on close.
    pub const RELOAD_JS: Template<ReloadVars> = Template::new(include_str!("serve/reload.js"));

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_reload_js_points_at_subscription_port() {
            let js = RELOAD_JS.render(&ReloadVars {
                port: 8765,
                retry_ms: 1500,
            });

            assert!(js.contains("var port = 8765;"));
            assert!(js.contains("var retryMs = 1500;"));
            assert!(js.contains("\"wss://\" + location.hostname"));
            assert!(js.contains("\"reload\""));
            assert!(!js.contains("__"));
        }
    }
}
