//! Canonical JSON rendering and output files
//!
//! Every document is written twice: `{name}.json` with the canonical text
//! and `{name}.json.gz` holding the gzip of exactly the same bytes.
//!
//! Canonical means sorted object keys, no whitespace between tokens, and
//! DEL and non-ASCII characters escaped as `\uXXXX`, so regenerated files compare
//! byte-for-byte with previously published ones.

use crate::aggregate::ProfileDocument;
use crate::config::TargetTable;
use crate::manifest::PackageSet;
use flate2::write::GzEncoder;
use flate2::Compression;
use pkgjson_common::Result;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, Serializer};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Compact formatter that escapes everything outside printable ASCII.
///
/// serde_json already escapes control characters below U+0020; DEL and
/// anything above it are handled here.
struct AsciiFormatter;

fn needs_escape(ch: char) -> bool {
    !ch.is_ascii() || ch == '\x7f'
}

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if !fragment.chars().any(needs_escape) {
            return CompactFormatter.write_string_fragment(writer, fragment);
        }

        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if !needs_escape(ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Render `value` as canonical JSON text.
///
/// Key order comes from serde_json's sorted map and the `BTreeMap`s used
/// throughout the crate.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    // Round-trip through `Value` so struct fields are sorted like map keys.
    let value = serde_json::to_value(value)?;

    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, AsciiFormatter);
    value.serialize(&mut serializer)?;

    // The formatter only ever emits ASCII.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write `{name}.json` and `{name}.json.gz` into `dir`.
pub fn write_document(dir: &Path, name: &str, text: &str) -> Result<()> {
    let plain = dir.join(format!("{}.json", name));
    std::fs::write(&plain, text)?;

    let compressed = dir.join(format!("{}.json.gz", name));
    let mut encoder = GzEncoder::new(std::fs::File::create(&compressed)?, Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish()?;

    debug!(path = %plain.display(), bytes = text.len(), "Wrote document");
    Ok(())
}

/// Sorted package names.
pub fn package_index(packages: &PackageSet) -> Vec<&str> {
    packages.keys().map(String::as_str).collect()
}

/// Package name -> declared version.
///
/// Records without a `version` attribute are left out.
pub fn package_versions(packages: &PackageSet) -> BTreeMap<&str, &str> {
    packages
        .iter()
        .filter_map(|(name, record)| match record.get("version") {
            Some(version) => Some((name.as_str(), version.as_str())),
            None => {
                warn!(package = %name, "Package has no version, leaving it out of versions.json");
                None
            },
        })
        .collect()
}

/// Write `manifests`, `index` and `versions` for one target.
pub fn write_package_set(target_dir: &Path, packages: &PackageSet) -> Result<()> {
    std::fs::create_dir_all(target_dir)?;

    write_document(target_dir, "manifests", &to_canonical_json(packages)?)?;
    write_document(target_dir, "index", &to_canonical_json(&package_index(packages))?)?;
    write_document(target_dir, "versions", &to_canonical_json(&package_versions(packages))?)?;

    Ok(())
}

/// Write the global `profiles` and `targets` documents for one version.
pub fn write_profiles(version_dir: &Path, profiles: &ProfileDocument, targets: &TargetTable) -> Result<()> {
    std::fs::create_dir_all(version_dir)?;

    write_document(version_dir, "profiles", &to_canonical_json(profiles)?)?;
    write_document(version_dir, "targets", &to_canonical_json(targets)?)?;

    Ok(())
}
