//! Run driver: mirrors every configured version once
//!
//! For each version the target listing is fetched, package sets are
//! rendered per target, and the global `profiles` / `targets` documents are
//! written after all targets' profiles have been merged.

use crate::aggregate::{Aggregator, PackagePhase};
use crate::config::Config;
use crate::origin::Origin;
use crate::render::{write_package_set, write_profiles};
use pkgjson_common::{PkgJsonError, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Version name that maps to the rolling `snapshots` tree
pub const SNAPSHOT_VERSION: &str = "SNAPSHOT";

/// Directory of a version relative to both the origin and the output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDir(String);

impl VersionDir {
    /// `SNAPSHOT` -> `snapshots`, anything else -> `releases/<version>`
    pub fn for_version(version: &str) -> Self {
        if version == SNAPSHOT_VERSION {
            Self("snapshots".to_string())
        } else {
            Self(format!("releases/{}", version))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What one version's update produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub version: String,
    pub targets: usize,
    pub package_sets_written: usize,
    pub targets_skipped: usize,
    pub profiles: usize,
}

/// Mirrors one version into `<output_dir>/<version-dir>`
pub struct VersionUpdater<'a> {
    origin: &'a Origin,
    config: &'a Config,
    version: String,
    version_dir: VersionDir,
    output_path: PathBuf,
}

impl<'a> VersionUpdater<'a> {
    /// Create the updater and its output directory.
    pub fn new(origin: &'a Origin, config: &'a Config, version: &str) -> Result<Self> {
        let version_dir = VersionDir::for_version(version);
        let output_path = config.output_dir.join(version_dir.as_str());
        std::fs::create_dir_all(&output_path)?;

        Ok(Self {
            origin,
            config,
            version: version.to_string(),
            version_dir,
            output_path,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Fetch, merge and render everything published for this version.
    pub async fn update_all(&self) -> Result<UpdateSummary> {
        let version_dir = self.version_dir.as_str();
        let targets = self.origin.fetch_targets(version_dir).await;
        info!(version = %self.version, targets = targets.len(), "Fetched target listing");

        let aggregator = Aggregator::new(self.origin, self.config, version_dir);

        let PackagePhase { written, skipped } = aggregator
            .for_each_package_set(&targets, |target, packages| {
                let target_dir = self.output_path.join(target);
                // Rendering and gzip are blocking; keep them off the fetch stream.
                async move {
                    tokio::task::spawn_blocking(move || write_package_set(&target_dir, &packages))
                        .await
                        .map_err(std::io::Error::other)?
                }
            })
            .await;

        let mut profiles = 0;
        if !targets.is_empty() {
            let document = aggregator.collect_profiles(&targets).await;
            profiles = document.profiles().len();
            write_profiles(&self.output_path, &document, &self.config.targets)?;
        }

        Ok(UpdateSummary {
            version: self.version.clone(),
            targets: targets.len(),
            package_sets_written: written,
            targets_skipped: skipped,
            profiles,
        })
    }
}

/// Mirror every configured version, in order.
///
/// A version that fails (output not writable) is logged and the next one is
/// attempted; the run fails only when no version succeeded.
pub async fn run(config: &Config) -> Result<Vec<UpdateSummary>> {
    let origin = Origin::from_config(config)?;
    let mut summaries = Vec::with_capacity(config.versions.len());

    for version in &config.versions {
        let span = info_span!("version", version = %version);
        let started = Instant::now();

        let result: Result<UpdateSummary> = async {
            VersionUpdater::new(&origin, config, version)?
                .update_all()
                .await
        }
        .instrument(span)
        .await;

        match result {
            Ok(summary) => {
                info!(
                    version = %summary.version,
                    targets = summary.targets,
                    package_sets = summary.package_sets_written,
                    skipped = summary.targets_skipped,
                    profiles = summary.profiles,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Version mirrored"
                );
                summaries.push(summary);
            },
            Err(e) => {
                error!(version = %version, error = %e, "Failed to mirror version");
            },
        }
    }

    if summaries.is_empty() {
        return Err(PkgJsonError::run_failed(format!(
            "no version could be mirrored into '{}'",
            config.output_dir.display()
        )));
    }

    Ok(summaries)
}
