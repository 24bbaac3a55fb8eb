//! Command-line flags for logship-daemon.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// logship log shipping daemon.
///
/// Reads newline-delimited JSON objects from stdin, persists them to the
/// configured queue and ships them in batches to the configured output.
#[derive(Parser, Debug)]
#[command(name = "logship-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logship.toml configuration file.
    #[arg(short, long, default_value = "/etc/logship/logship.toml")]
    pub config: PathBuf,

    /// Diagnostic log level, replacing `[general] log_level`.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Diagnostic log format (`json` or `pretty`), replacing `[general] log_format`.
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Check the configuration, print the result and exit.
    #[arg(long)]
    pub validate: bool,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9100).
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
