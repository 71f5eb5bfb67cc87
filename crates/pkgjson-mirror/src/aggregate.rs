//! Per-target aggregation of package sets and device profiles
//!
//! Fetching runs concurrently, bounded by the configured pool size. Package
//! sets are independent per target and are handed to a sink as soon as they
//! are complete. Profiles feed one shared document, so those results are
//! merged one at a time, in target-listing order, on the calling task.

use crate::config::Config;
use crate::manifest::{merge_package_sets, parse_manifest, PackageSet};
use crate::origin::Origin;
use futures::stream::{self, StreamExt};
use pkgjson_common::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Key of the profile map in the published and upstream documents
const PROFILES_KEY: &str = "profiles";

/// Attribute naming the owning target, injected into every profile
const TARGET_KEY: &str = "target";

/// Profiles and auxiliary metadata published for one target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetProfiles {
    pub target: String,
    pub metadata: Map<String, Value>,
    pub profiles: Map<String, Value>,
}

impl TargetProfiles {
    /// Split an upstream `profiles.json` document.
    ///
    /// Anything but a JSON object yields no metadata and no profiles.
    pub fn from_document(target: &str, document: Value) -> Self {
        let mut result = Self {
            target: target.to_string(),
            ..Self::default()
        };

        let Value::Object(mut metadata) = document else {
            warn!(target_id = target, "profiles.json is not a JSON object, ignoring it");
            return result;
        };

        match metadata.remove(PROFILES_KEY) {
            Some(Value::Object(profiles)) => result.profiles = profiles,
            Some(other) => {
                warn!(target_id = target, kind = json_kind(&other), "profiles member is not an object");
            },
            None => {},
        }

        for profile in result.profiles.values_mut() {
            if let Value::Object(fields) = profile {
                fields.insert(TARGET_KEY.to_string(), Value::String(target.to_string()));
            }
        }

        result.metadata = metadata;
        result
    }
}

/// Global profile document: merged metadata plus every target's profiles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileDocument {
    #[serde(flatten)]
    metadata: Map<String, Value>,
    profiles: Map<String, Value>,
}

impl ProfileDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one target's result; later merges win on any key collision.
    pub fn merge(&mut self, batch: TargetProfiles) {
        for (key, value) in batch.metadata {
            if key != PROFILES_KEY {
                self.metadata.insert(key, value);
            }
        }

        for (id, profile) in batch.profiles {
            if let Some(previous) = self.profiles.insert(id.clone(), profile) {
                let previous_target = previous.get(TARGET_KEY).and_then(|t| t.as_str()).unwrap_or("?");
                debug!(
                    profile = %id,
                    previous_target,
                    target_id = %batch.target,
                    "Profile id already present, overwriting"
                );
            }
        }

        // Per-target metadata carries its own target name; it means nothing globally.
        self.metadata.remove(TARGET_KEY);
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn profiles(&self) -> &Map<String, Value> {
        &self.profiles
    }
}

/// Outcome of the package phase for one version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackagePhase {
    pub written: usize,
    pub skipped: usize,
}

/// Fetches and merges the remote data of one version directory
pub struct Aggregator<'a> {
    origin: &'a Origin,
    config: &'a Config,
    version_dir: &'a str,
}

impl<'a> Aggregator<'a> {
    pub fn new(origin: &'a Origin, config: &'a Config, version_dir: &'a str) -> Self {
        Self {
            origin,
            config,
            version_dir,
        }
    }

    /// Merged package set of `target`, or `None` when the target is skipped.
    ///
    /// The target's own manifest comes first, then every configured repository
    /// in order, each overriding same-named packages.
    pub async fn package_set(&self, target: &str) -> Option<PackageSet> {
        let Some(arch) = self.config.targets.arch(target) else {
            warn!(target_id = target, "Unknown arch for target, skipping");
            return None;
        };

        info!(target_id = target, arch, "Collecting packages");

        let url = self.origin.target_manifest_url(self.version_dir, target);
        let mut packages = parse_manifest(&self.origin.fetch_text(&url).await, target);

        for repo in &self.config.repos {
            let url = self.origin.repo_manifest_url(self.version_dir, arch, repo);
            let overlay = parse_manifest(&self.origin.fetch_text(&url).await, repo);
            merge_package_sets(&mut packages, overlay);
        }

        if packages.is_empty() {
            warn!(target_id = target, "No packages for target, skipping");
            return None;
        }

        debug!(target_id = target, packages = packages.len(), "Package set complete");
        Some(packages)
    }

    /// Profiles of `target`; empty when `profiles.json` is unavailable.
    pub async fn target_profiles(&self, target: &str) -> TargetProfiles {
        let url = self.origin.profiles_url(self.version_dir, target);
        let document = self.origin.fetch_json(&url).await;
        let profiles = TargetProfiles::from_document(target, document);

        debug!(target_id = target, profiles = profiles.profiles.len(), "Fetched profiles");
        profiles
    }

    /// Build every target's package set concurrently and pass it to `sink`.
    ///
    /// Completion order is arbitrary; `sink` must only touch state keyed by
    /// the target it is given. A failing sink counts the target as skipped.
    pub async fn for_each_package_set<F, Fut>(&self, targets: &[String], sink: F) -> PackagePhase
    where
        F: Fn(&str, PackageSet) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let sink = &sink;
        let outcomes: Vec<bool> = stream::iter(targets)
            .map(|target| async move {
                let target = target.as_str();
                let Some(packages) = self.package_set(target).await else {
                    return false;
                };

                match sink(target, packages).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(target_id = target, error = %e, "Failed to write package set");
                        false
                    },
                }
            })
            .buffer_unordered(self.config.pool_size)
            .collect()
            .await;

        let written = outcomes.iter().filter(|written| **written).count();
        PackagePhase {
            written,
            skipped: outcomes.len() - written,
        }
    }

    /// Fetch every target's profiles concurrently and merge them in order.
    pub async fn collect_profiles(&self, targets: &[String]) -> ProfileDocument {
        stream::iter(targets)
            .map(|target| self.target_profiles(target.as_str()))
            .buffered(self.config.pool_size)
            .fold(ProfileDocument::new(), |mut document, batch| async move {
                document.merge(batch);
                document
            })
            .await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
