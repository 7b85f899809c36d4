//! reloadd - local HTTPS dev server that reloads open browser tabs when
//! watched files change.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod reload;
mod serve;
mod tls;
mod utils;

use actor::Coordinator;
use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::DevConfig;
use core::{Shutdown, install_ctrlc_handler};

fn main() -> Result<()> {
    let shutdown = Shutdown::new();

    // Setup Ctrl+C handler (before any blocking operations)
    install_ctrlc_handler(std::sync::Arc::clone(&shutdown))?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = DevConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("serve"; "config: {}", path.display());
    }

    Coordinator::start(config, shutdown)?.run()
}
