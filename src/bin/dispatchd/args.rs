use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Reads settings from a YAML file.
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
    /// Address to listen on.
    #[arg(short, long)]
    pub(crate) listen: Option<IpAddr>,
    /// (TCP) port to listen on.
    #[arg(short, long, env = "PORT")]
    pub(crate) port: Option<u16>,
    /// Sets the longest accepted command line, in bytes.
    #[arg(short = 'z', long)]
    pub(crate) max_line_len: Option<usize>,
    /// Seconds to wait for open connections to close on shutdown.
    #[arg(short = 'g', long)]
    pub(crate) shutdown_grace_secs: Option<u64>,
    /// Enables human-friendly logging.
    #[arg(short, long, default_value_t)]
    pub(crate) debug: bool,
}
