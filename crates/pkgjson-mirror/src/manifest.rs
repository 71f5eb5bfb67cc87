//! Package manifest parsing
//!
//! A manifest is a sequence of paragraphs separated by empty lines. Each
//! paragraph holds `Key: Value` headers in the control-file style:
//!
//! ```text
//! Package: foo
//! Version: 1.0
//! Description: first line
//!  continued here
//! ```
//!
//! Parsing is lenient. Lines that are neither a header nor a continuation
//! are ignored, and a paragraph without a `Package` header is dropped with
//! a warning instead of failing the whole manifest.

use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Normalized attributes of one package (`installed_size`, `version`, ...)
pub type PackageRecord = BTreeMap<String, String>;

/// Package name -> record, for one target
pub type PackageSet = BTreeMap<String, PackageRecord>;

/// Header holding the package name (matched case-insensitively)
const PACKAGE_HEADER: &str = "Package";

/// Attribute injected into every record with the source repository label
pub const REPO_ATTRIBUTE: &str = "repo";

/// Parse manifest text into a package set, labelling records with `repo`.
///
/// A later paragraph for an already seen package replaces the earlier one.
pub fn parse_manifest(text: &str, repo: &str) -> PackageSet {
    let mut packages = PackageSet::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            flush_paragraph(&mut paragraph, repo, &mut packages);
        } else {
            paragraph.push(line);
        }
    }
    flush_paragraph(&mut paragraph, repo, &mut packages);

    debug!(repo, packages = packages.len(), "Parsed manifest");
    packages
}

/// Merge `overlay` into `base`; records in `overlay` win on name collision.
pub fn merge_package_sets(base: &mut PackageSet, overlay: PackageSet) {
    base.extend(overlay);
}

fn flush_paragraph(paragraph: &mut Vec<&str>, repo: &str, packages: &mut PackageSet) {
    if paragraph.is_empty() {
        return;
    }

    let headers = parse_headers(paragraph);
    match into_record(headers, repo) {
        Some((name, record)) => {
            packages.insert(name, record);
        },
        None => {
            warn!(
                repo,
                first_line = paragraph[0],
                lines = paragraph.len(),
                "Manifest paragraph has no Package header, skipping"
            );
        },
    }

    paragraph.clear();
}

/// Scan the lines of one paragraph into `(name, value)` headers in order.
///
/// Continuation lines (leading space or tab) are appended to the previous
/// value after a newline, keeping their indentation.
fn parse_headers<'a>(lines: &[&'a str]) -> Vec<(&'a str, String)> {
    let mut headers: Vec<(&'a str, String)> = Vec::new();

    for line in lines {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push('\n');
                value.push_str(line);
            }
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !is_header_name(name) {
            continue;
        }

        headers.push((name, value.trim_start_matches([' ', '\t']).to_string()));
    }

    headers
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic())
}

/// `Installed-Size` -> `installed_size`
pub fn normalize_header_name(name: &str) -> String {
    name.to_ascii_lowercase().replace('-', "_")
}

fn into_record(headers: Vec<(&str, String)>, repo: &str) -> Option<(String, PackageRecord)> {
    let name = headers
        .iter()
        .find(|(header, _)| header.eq_ignore_ascii_case(PACKAGE_HEADER))
        .map(|(_, value)| value.clone())
        .filter(|value| !value.is_empty())?;

    let mut record: PackageRecord = headers
        .into_iter()
        .map(|(header, value)| (normalize_header_name(header), value))
        .collect();
    record.insert(REPO_ATTRIBUTE.to_string(), repo.to_string());

    Some((name, record))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_MANIFEST: &str = "Package: foo\nVersion: 1.0\nInstalled-Size: 100\n\nPackage: bar\nVersion: 2.0\n";

    fn record(pairs: &[(&str, &str)]) -> PackageRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_two_paragraphs() {
        let packages = parse_manifest(BASE_MANIFEST, "base");

        assert_eq!(packages.len(), 2);
        assert_eq!(
            packages["foo"],
            record(&[
                ("installed_size", "100"),
                ("package", "foo"),
                ("repo", "base"),
                ("version", "1.0"),
            ])
        );
        assert_eq!(
            packages["bar"],
            record(&[("package", "bar"), ("repo", "base"), ("version", "2.0")])
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_manifest("", "base").is_empty());
        assert!(parse_manifest("\n\n\n", "base").is_empty());
    }

    #[test]
    fn test_paragraph_without_package_is_dropped() {
        let text = "Version: 1.0\nArchitecture: all\n\nPackage: kept\nVersion: 3\n\n";
        let packages = parse_manifest(text, "base");

        assert_eq!(packages.len(), 1);
        assert!(packages.contains_key("kept"));
    }

    #[test]
    fn test_empty_package_name_is_dropped() {
        let packages = parse_manifest("Package:\nVersion: 1\n", "base");
        assert!(packages.is_empty());
    }

    #[test]
    fn test_header_names_are_normalized() {
        let text = "Package: libfoo\nInstalled-Size: 4096\nSOURCE-Date-Epoch: 1700000000\n";
        let packages = parse_manifest(text, "base");
        let libfoo = &packages["libfoo"];

        assert_eq!(libfoo["installed_size"], "4096");
        assert_eq!(libfoo["source_date_epoch"], "1700000000");
    }

    #[test]
    fn test_continuation_lines_are_kept() {
        let text = "Package: foo\nDescription: first line\n second line\n\tthird line\nVersion: 1\n";
        let packages = parse_manifest(text, "base");

        assert_eq!(
            packages["foo"]["description"],
            "first line\n second line\n\tthird line"
        );
        assert_eq!(packages["foo"]["version"], "1");
    }

    #[test]
    fn test_lines_without_colon_are_ignored() {
        let text = "Package: foo\nthis line is noise\nVersion: 1.2\n";
        let packages = parse_manifest(text, "base");

        assert_eq!(
            packages["foo"],
            record(&[("package", "foo"), ("repo", "base"), ("version", "1.2")])
        );
    }

    #[test]
    fn test_value_keeps_inner_colons() {
        let text = "Package: foo\nSource: feeds/base/foo\nDepends: libc, libubox20240329:1\n";
        let packages = parse_manifest(text, "base");

        assert_eq!(packages["foo"]["depends"], "libc, libubox20240329:1");
    }

    #[test]
    fn test_final_paragraph_without_trailing_blank_line() {
        let packages = parse_manifest("Package: last\nVersion: 9", "base");
        assert_eq!(packages["last"]["version"], "9");
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "Package: foo\r\nVersion: 1.0\r\n\r\nPackage: bar\r\nVersion: 2.0\r\n";
        let packages = parse_manifest(text, "base");

        assert_eq!(packages.len(), 2);
        assert_eq!(packages["bar"]["version"], "2.0");
    }

    #[test]
    fn test_repo_attribute_overrides_header() {
        let packages = parse_manifest("Package: foo\nRepo: upstream\n", "luci");
        assert_eq!(packages["foo"]["repo"], "luci");
    }

    #[test]
    fn test_package_header_case_insensitive() {
        let packages = parse_manifest("package: foo\nversion: 1\n", "base");
        assert_eq!(packages["foo"]["package"], "foo");
    }

    #[test]
    fn test_paragraph_count_matches_distinct_packages() {
        let text: String = (0..25)
            .map(|i| format!("Package: pkg{i}\nVersion: {i}.0\n\n"))
            .collect();
        let packages = parse_manifest(&text, "base");

        assert_eq!(packages.len(), 25);
        assert!(packages
            .values()
            .all(|r| r.contains_key("package") && r.contains_key("repo")));
    }

    #[test]
    fn test_merge_later_repository_wins() {
        let mut packages = parse_manifest(BASE_MANIFEST, "base");
        merge_package_sets(&mut packages, parse_manifest("Package: foo\nVersion: 1.1\n", "extra"));

        assert_eq!(packages["foo"]["version"], "1.1");
        assert_eq!(packages["foo"]["repo"], "extra");
        assert!(!packages["foo"].contains_key("installed_size"));
        assert_eq!(packages["bar"]["repo"], "base");
        assert_eq!(packages["bar"]["version"], "2.0");
    }
}
