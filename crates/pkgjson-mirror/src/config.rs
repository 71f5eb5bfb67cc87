//! Mirror configuration
//!
//! Loaded once from a YAML file (usually `config.yml`), then overridden by
//! environment variables and CLI flags, and passed by reference from there.

use pkgjson_common::{PkgJsonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Worker pool size when the config does not set one.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Output root when the config does not set one.
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Mirror configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Origin for the target listing and package manifests
    pub base_url: String,

    /// Origin for per-target `profiles.json`; falls back to `base_url`
    #[serde(default)]
    pub json_url: Option<String>,

    /// Root of the rendered tree
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Versions to mirror; `SNAPSHOT` maps to `snapshots/`
    #[serde(default)]
    pub versions: Vec<String>,

    /// Extra repositories merged into every target, lowest precedence first
    #[serde(default)]
    pub repos: Vec<String>,

    /// Number of targets fetched concurrently
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Static target table, rendered verbatim as `targets.json`
    #[serde(default)]
    pub targets: TargetTable,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

/// Target id -> free-form attributes; only `arch` is interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TargetTable(BTreeMap<String, serde_json::Value>);

impl TargetTable {
    /// Package architecture of `target`, if the table knows it.
    pub fn arch(&self, target: &str) -> Option<&str> {
        self.0
            .get(target)?
            .get("arch")?
            .as_str()
            .filter(|arch| !arch.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, A: Into<String>> FromIterator<(K, A)> for TargetTable {
    /// Build a table of `target -> { "arch": arch }` entries.
    fn from_iter<I: IntoIterator<Item = (K, A)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(target, arch)| {
                    (target.into(), serde_json::json!({ "arch": arch.into() }))
                })
                .collect(),
        )
    }
}

impl Config {
    /// Minimal config pointing both origins at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            json_url: None,
            output_dir: default_output_dir(),
            versions: vec!["SNAPSHOT".to_string()],
            repos: Vec::new(),
            pool_size: DEFAULT_POOL_SIZE,
            targets: TargetTable::default(),
        }
    }

    /// Load from a YAML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(config_path = %path.display(), "Loading configuration");

        if !path.exists() {
            return Err(PkgJsonError::config(format!(
                "config file '{}' not found",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?.merge_env()?;
        config.validate()?;

        config.trace_loaded();
        Ok(config)
    }

    /// Parse YAML text without touching the environment.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| PkgJsonError::config(format!("failed to parse YAML: {}", e)))
    }

    /// Apply environment overrides
    ///
    /// - `PKGJSON_BASE_URL`
    /// - `PKGJSON_JSON_URL`
    /// - `PKGJSON_OUTPUT_DIR`
    /// - `PKGJSON_POOL_SIZE`
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("PKGJSON_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(url) = std::env::var("PKGJSON_JSON_URL") {
            self.json_url = Some(url);
        }

        if let Ok(dir) = std::env::var("PKGJSON_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Ok(size) = std::env::var("PKGJSON_POOL_SIZE") {
            self.pool_size = size.parse().map_err(|_| {
                PkgJsonError::config(format!("PKGJSON_POOL_SIZE must be a number, got '{}'", size))
            })?;
        }

        Ok(self)
    }

    /// Check the invariants the mirror relies on.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(PkgJsonError::config("base_url must not be empty"));
        }

        if self.json_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err(PkgJsonError::config("json_url must not be empty when set"));
        }

        if self.pool_size == 0 {
            return Err(PkgJsonError::config("pool_size must be at least 1"));
        }

        if self.versions.is_empty() {
            return Err(PkgJsonError::config("at least one version must be configured"));
        }

        Ok(())
    }

    /// Origin serving `profiles.json`
    pub fn json_url(&self) -> &str {
        self.json_url.as_deref().unwrap_or(&self.base_url)
    }

    fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            json_url = %self.json_url(),
            output_dir = %self.output_dir.display(),
            versions = self.versions.len(),
            repos = self.repos.len(),
            targets = self.targets.len(),
            pool_size = self.pool_size,
            "Configuration loaded"
        );
        debug!(?self, "Configuration (full)");
    }
}
