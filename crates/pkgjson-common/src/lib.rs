//! pkgjson common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the pkgjson workspace.
//!
//! - **Error Handling**: [`PkgJsonError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use pkgjson_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("mirror starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{PkgJsonError, Result};
