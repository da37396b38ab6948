//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{load_config, ConfigError, GatewayConfig};

/// Human-readable application name.
pub const APP_NAME: &str = "TaskQ Redis Publisher";

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity string served on `GET /`.
pub fn identity() -> String {
    format!("{} v{}\n", APP_NAME, VERSION)
}

#[derive(Debug, Parser)]
#[command(name = "taskq-publisher")]
#[command(about = "HTTP gateway that appends JSON payloads to Redis lists", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Address and port to listen
    #[arg(long, value_name = "HOST:PORT")]
    pub bind: Option<String>,

    /// Address and port of the Redis server
    #[arg(long, value_name = "HOST:PORT")]
    pub redis_address: Option<String>,

    /// Verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Show version
    #[arg(long)]
    pub version: bool,

    /// Optional TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Record published channels and sample their length
    #[arg(long)]
    pub watch_queues: bool,
}

impl Cli {
    /// Text printed by `--version`.
    pub fn version_text() -> String {
        format!("{}\nVersion: {}\n", APP_NAME, VERSION)
    }

    /// Load the config file, if any, and apply flag overrides.
    pub fn into_config(self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(redis_address) = self.redis_address {
            config.redis.address = redis_address;
        }
        if self.verbose {
            config.observability.verbose = true;
        }
        if self.watch_queues {
            config.watcher.enabled = true;
        }

        Ok(config)
    }
}
