// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Total order over installed plugin versions.
//!
//! Versions are parsed leniently as semver: missing minor and patch
//! components are padded with zeros. Parseable versions compare by semver
//! precedence with the raw string as tie-breaker. Unparseable versions sort
//! below every parseable version and compare ordinally among themselves.

use std::cmp::Ordering;

use semver::Version;

/// Parses a version, padding `1` to `1.0.0` and `1.2` to `1.2.0`.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    if let Ok(v) = Version::parse(raw) {
        return Some(v);
    }

    // Pad only the numeric core; keep any pre-release or build suffix.
    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

/// Compares two version strings under the hub's total order.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Returns the greatest version, if any.
pub fn latest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare(a, b))
}

/// Sorts versions ascending.
pub fn sort(versions: &mut [String]) {
    versions.sort_by(|a, b| compare(a, b));
}
