//! Shared fixtures: a mock build origin serving one snapshot tree

#![allow(dead_code)]

use flate2::read::GzDecoder;
use pkgjson_mirror::config::{Config, TargetTable};
use serde_json::{json, Value};
use std::io::Read;
use std::path::Path;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const ATH79_MANIFEST: &str = "\
Package: base-files
Version: 1580-r26100
Installed-Size: 51200
Description: This package contains a base filesystem and system scripts
 for OpenWrt.

Package: kmod-ath9k
Version: 6.6.30-1
Depends: kernel, kmod-ath9k-common

Version: 0.1
Description: paragraph without a package name
";

pub const BASE_REPO_MANIFEST: &str = "\
Package: base-files
Version: 1580-r26200
Installed-Size: 51300

Package: busybox
Version: 1.36.1-1
";

pub const X86_MANIFEST: &str = "\
Package: kmod-e1000
Version: 6.6.30-1
";

/// Mount a 200 response for `route`.
pub async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Origin for `version_dir` with three listed targets:
///
/// - `ath79/generic`: own manifest, `base` repo, `luci` repo missing (404)
/// - `x86/64`: own manifest only
/// - `ramips/mt7621`: known arch but nothing published
/// - `unknown/target`: listed but absent from the config table
pub async fn mount_origin(server: &MockServer, version_dir: &str) {
    serve(
        server,
        &format!("/{version_dir}/targets/"),
        ResponseTemplate::new(200).set_body_json(json!([
            "ath79/generic",
            "x86/64",
            "ramips/mt7621",
            "unknown/target"
        ])),
    )
    .await;

    serve(
        server,
        &format!("/{version_dir}/targets/ath79/generic/packages/Packages.manifest"),
        ResponseTemplate::new(200).set_body_string(ATH79_MANIFEST),
    )
    .await;
    serve(
        server,
        &format!("/{version_dir}/packages/mips_24kc/base/Packages.manifest"),
        ResponseTemplate::new(200).set_body_string(BASE_REPO_MANIFEST),
    )
    .await;
    serve(
        server,
        &format!("/{version_dir}/targets/x86/64/packages/Packages.manifest"),
        ResponseTemplate::new(200).set_body_string(X86_MANIFEST),
    )
    .await;

    serve(
        server,
        &format!("/{version_dir}/ath79/generic/profiles.json"),
        ResponseTemplate::new(200).set_body_json(json!({
            "arch_packages": "mips_24kc",
            "target": "ath79/generic",
            "version_code": "r26100",
            "profiles": {
                "tplink_archer-c7-v2": { "titles": [ { "vendor": "TP-Link", "model": "Archer C7", "variant": "v2" } ] },
                "shared": { "image_prefix": "ath79" }
            }
        })),
    )
    .await;
    serve(
        server,
        &format!("/{version_dir}/x86/64/profiles.json"),
        ResponseTemplate::new(200).set_body_json(json!({
            "arch_packages": "x86_64",
            "target": "x86/64",
            "version_code": "r26200",
            "profiles": {
                "generic": { "titles": [ { "title": "Generic x86/64" } ] },
                "shared": { "image_prefix": "x86" }
            }
        })),
    )
    .await;
}

pub fn target_table() -> TargetTable {
    [
        ("ath79/generic", "mips_24kc"),
        ("x86/64", "x86_64"),
        ("ramips/mt7621", "mipsel_24kc"),
    ]
    .into_iter()
    .collect()
}

pub fn config(server: &MockServer, output_dir: &Path, versions: &[&str]) -> Config {
    let mut config = Config::new(server.uri());
    config.output_dir = output_dir.to_path_buf();
    config.versions = versions.iter().map(|v| v.to_string()).collect();
    config.repos = vec!["base".to_string(), "luci".to_string()];
    config.pool_size = 2;
    config.targets = target_table();
    config
}

pub fn read_json(path: &Path) -> Value {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    serde_json::from_slice(&bytes).unwrap()
}

pub fn gunzip(path: &Path) -> Vec<u8> {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    let mut decompressed = Vec::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut decompressed)
        .unwrap();
    decompressed
}
