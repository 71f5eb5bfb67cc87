//! Command-line interface

use crate::config::Config;
use crate::manifest::parse_manifest;
use crate::render::to_canonical_json;
use crate::updater;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pkgjson")]
#[command(author, version, about = "Mirror package manifests and device profiles into static JSON")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mirror every configured version into the output directory
    Sync {
        /// Path to the YAML config file
        #[arg(short, long, default_value = "config.yml", env = "PKGJSON_CONFIG")]
        config: PathBuf,

        /// Only mirror these versions (repeatable), e.g. SNAPSHOT or 23.05.3
        #[arg(short, long = "release", value_name = "VERSION")]
        releases: Vec<String>,

        /// Output directory, overrides the config file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of targets fetched concurrently
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Parse a local Packages.manifest and print its canonical JSON
    Manifest {
        /// Manifest file to parse
        file: PathBuf,

        /// Repository label stored in every record
        #[arg(short, long, default_value = "local")]
        repo: String,
    },
}

/// Execute the parsed command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync {
            config,
            releases,
            output,
            jobs,
        } => {
            let mut config = Config::load(&config)?;
            if !releases.is_empty() {
                config.versions = releases;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(jobs) = jobs {
                config.pool_size = jobs;
            }
            config.validate()?;

            let summaries = updater::run(&config).await?;
            let written: usize = summaries.iter().map(|s| s.package_sets_written).sum();
            info!(
                versions = summaries.len(),
                package_sets = written,
                output_dir = %config.output_dir.display(),
                "Mirror complete"
            );
        },
        Command::Manifest { file, repo } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read manifest '{}'", file.display()))?;
            let packages = parse_manifest(&text, &repo);
            println!("{}", to_canonical_json(&packages)?);
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_overrides() {
        let cli = Cli::try_parse_from([
            "pkgjson", "sync", "--config", "mirror.yml", "-r", "SNAPSHOT", "-r", "23.05.3", "-j", "2",
        ])
        .unwrap();

        match cli.command {
            Command::Sync {
                config,
                releases,
                output,
                jobs,
            } => {
                assert_eq!(config, PathBuf::from("mirror.yml"));
                assert_eq!(releases, vec!["SNAPSHOT", "23.05.3"]);
                assert_eq!(output, None);
                assert_eq!(jobs, Some(2));
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
