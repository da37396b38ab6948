//! TaskQ Redis Publisher
//!
//! An HTTP gateway that accepts JSON jobs and appends them to Redis lists.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │               TASKQ PUBLISHER                │
//!                      │                                              │
//!   POST /put          │  ┌─────────┐    ┌─────────┐    ┌──────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│ publish │───▶│  queue   │──┼──▶ Redis RPUSH
//!                      │  │ server  │    │pipeline │    │  store   │  │
//!                      │  └─────────┘    └────┬────┘    └──────────┘  │
//!                      │                      │                       │
//!                      │                 ┌────▼────┐                  │
//!                      │                 │  idgen  │                  │
//!                      │                 └─────────┘                  │
//!                      │                                              │
//!                      │  ┌────────────────────────────────────────┐  │
//!                      │  │          Cross-Cutting Concerns        │  │
//!                      │  │  config · observability · lifecycle    │  │
//!                      │  └────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::process::ExitCode;

use taskq_publisher::cli::Cli;
use taskq_publisher::config::{validate_config, ConfigError};
use taskq_publisher::lifecycle::startup;
use taskq_publisher::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        print!("{}", Cli::version_text());
        return ExitCode::SUCCESS;
    }

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            // Logger is configured from this file, so it is not up yet.
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.observability.verbose, config.observability.log_format);

    let addrs = match validate_config(&config) {
        Ok(addrs) => addrs,
        Err(errors) => {
            tracing::error!(error = %ConfigError::Validation(errors), "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        bind_address = %addrs.bind,
        redis_address = %addrs.redis,
        verbose = config.observability.verbose,
        watch_queues = config.watcher.enabled,
        "Starting {} v{}",
        taskq_publisher::cli::APP_NAME,
        taskq_publisher::cli::VERSION,
    );

    if let Err(e) = startup::run(config, addrs).await {
        tracing::error!(error = %e, "Startup failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
