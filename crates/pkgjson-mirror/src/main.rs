//! pkgjson - package metadata mirror

use anyhow::Result;
use clap::Parser;
use pkgjson_common::logging::{init_logging, LogConfig, LogLevel};
use pkgjson_mirror::{cli, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("pkgjson")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    cli::execute(cli).await
}
