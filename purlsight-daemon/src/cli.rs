//! CLI argument definitions for purlsight-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use purlsight_core::PurlsightConfig;

/// Purlsight static-analysis issue daemon.
///
/// Resolves package URLs to known component releases and serves the
/// static-analysis findings recorded for their files over HTTP.
#[derive(Parser, Debug)]
#[command(name = "purlsight-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to purlsight.toml configuration file.
    #[arg(short, long, default_value = "/etc/purlsight/purlsight.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the HTTP listen address.
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Override the HTTP listen port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut PurlsightConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(addr) = &self.listen_addr {
            config.server.listen_addr.clone_from(addr);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
