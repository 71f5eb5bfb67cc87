//! HTTP access to the build infrastructure
//!
//! Every fetch is a plain GET without retries or authentication. Failures
//! never propagate: a transport error, a non-2xx status or an undecodable
//! body is logged and turns into an empty result, so one broken target
//! cannot abort the batch.

use crate::config::Config;
use pkgjson_common::{PkgJsonError, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("pkgjson/", env!("CARGO_PKG_VERSION"));

/// Remote origin for target listings, manifests and profiles
#[derive(Debug, Clone)]
pub struct Origin {
    client: Client,
    base_url: String,
    json_url: String,
}

impl Origin {
    /// Build an origin with the transport's default timeouts.
    pub fn new(base_url: impl Into<String>, json_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PkgJsonError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: trim_url(base_url.into()),
            json_url: trim_url(json_url.into()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url.clone(), config.json_url())
    }

    /// `{base_url}/{version_dir}/targets/?json-targets`
    pub fn targets_url(&self, version_dir: &str) -> String {
        format!("{}/{}/targets/?json-targets", self.base_url, version_dir)
    }

    /// Manifest built alongside the target's images
    pub fn target_manifest_url(&self, version_dir: &str, target: &str) -> String {
        format!(
            "{}/{}/targets/{}/packages/Packages.manifest",
            self.base_url, version_dir, target
        )
    }

    /// Manifest of a shared per-architecture repository
    pub fn repo_manifest_url(&self, version_dir: &str, arch: &str, repo: &str) -> String {
        format!(
            "{}/{}/packages/{}/{}/Packages.manifest",
            self.base_url, version_dir, arch, repo
        )
    }

    pub fn profiles_url(&self, version_dir: &str, target: &str) -> String {
        format!("{}/{}/{}/profiles.json", self.json_url, version_dir, target)
    }

    /// GET `url` as text; empty string on any failure.
    pub async fn fetch_text(&self, url: &str) -> String {
        let Some(response) = self.get(url).await else {
            return String::new();
        };

        match response.text().await {
            Ok(text) => {
                debug!(url, bytes = text.len(), "Fetched text");
                text
            },
            Err(e) => {
                warn!(url, error = %e, "Failed to read response body");
                String::new()
            },
        }
    }

    /// GET `url` as JSON; empty object on any failure.
    pub async fn fetch_json(&self, url: &str) -> Value {
        let empty = Value::Object(Default::default());
        let Some(response) = self.get(url).await else {
            return empty;
        };

        match response.json::<Value>().await {
            Ok(document) => document,
            Err(e) => {
                warn!(url, error = %e, "Response is not valid JSON");
                empty
            },
        }
    }

    /// Target ids published for a version; empty when the listing is unusable.
    pub async fn fetch_targets(&self, version_dir: &str) -> Vec<String> {
        let url = self.targets_url(version_dir);
        let document = self.fetch_json(&url).await;

        match serde_json::from_value::<Vec<String>>(document) {
            Ok(targets) => targets,
            Err(e) => {
                warn!(url = %url, version_dir, error = %e, "Failed to load targets");
                Vec::new()
            },
        }
    }

    async fn get(&self, url: &str) -> Option<reqwest::Response> {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => Some(response),
            Ok(response) => {
                warn!(url, status = %response.status(), "Origin returned an error status");
                None
            },
            Err(e) => {
                warn!(url, error = %e, "Request to origin failed");
                None
            },
        }
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
