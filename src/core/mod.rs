//! Core process state shared across the codebase.

mod shutdown;

pub use shutdown::{Shutdown, install_ctrlc_handler};
