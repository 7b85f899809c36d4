//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::net::IpAddr;
use std::path::PathBuf;

/// Serve a directory over HTTPS and reload open tabs when files change
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory to serve and watch (default: [watch] root, or cwd)
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: reloadd.toml, searched upward from cwd)
    #[arg(short = 'C', long, default_value = "reloadd.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// HTTPS port for content
    #[arg(short, long)]
    pub port: Option<u16>,

    /// WSS port for reload subscriptions
    #[arg(short, long)]
    pub reload_port: Option<u16>,

    /// PEM certificate chain
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub key: Option<PathBuf>,

    /// Coalesce bursts of file events within this many milliseconds (0 = off)
    #[arg(short, long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}
