use std::path::PathBuf;

use clap::Parser;

/// Command-line options. Values given here override the configuration file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// IP address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Control connection port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory sessions are confined to
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}
