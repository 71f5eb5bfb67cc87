//! pkgjson mirror library
//!
//! Mirrors package-repository metadata of a firmware build infrastructure
//! into static JSON documents for web tooling.
//!
//! # Pipeline
//!
//! - [`origin`]: HTTP GETs against the build origin, failures become empty results
//! - [`manifest`]: `Packages.manifest` paragraphs into package records
//! - [`aggregate`]: per-target package sets and the global profile document
//! - [`render`]: canonical JSON, written plain and gzip-compressed
//! - [`updater`]: drives all of the above once per configured version
//!
//! # Example
//!
//! ```no_run
//! use pkgjson_mirror::{config::Config, updater};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yml")?;
//!     for summary in updater::run(&config).await? {
//!         println!("{}: {} package sets", summary.version, summary.package_sets_written);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod manifest;
pub mod origin;
pub mod render;
pub mod updater;

pub use cli::{Cli, Command};
