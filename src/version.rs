//! Semver-aware version comparison with string-comparison fallback.
//!
//! Fixed-version strings in scanner reports are usually semantic versions
//! but can be anything (`"2.13.2.1"`, `"1.2.x"`, `"unknown"`). The
//! comparator is semver-aware when possible and degrades to ordinal string
//! comparison otherwise, so arbitration never fails on odd input.
//!
//! The tie-break between a semver and a non-semver string deliberately
//! favors the semver side. This is not a semver rule; it is a preserved
//! policy choice that keeps structured versions winning over free-form
//! strings.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static SEMVER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(.+))?(?:\+(.+))?$").expect("semver pattern")
});

/// Compares two optional version strings.
///
/// `None` is less than any present version; two `None`s are equal. When
/// both strings are valid semver the comparison follows semver precedence
/// (numeric release core, release outranks prerelease, dot-segment
/// prerelease comparison). When exactly one side is valid semver, that
/// side wins. When neither is, or anything inside the semver comparison
/// fails, the raw strings are compared ordinally.
pub fn compare_versions(a: Option<&str>, b: Option<&str>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    match (is_valid_semver(a), is_valid_semver(b)) {
        (true, true) => compare_semver(a, b).unwrap_or_else(|| a.cmp(b)),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Returns true if the trimmed string matches the semver pattern
/// `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`.
pub fn is_valid_semver(version: &str) -> bool {
    let trimmed = version.trim();
    !trimmed.is_empty() && SEMVER_PATTERN.is_match(trimmed)
}

/// Semver comparison of two strings already classified as valid semver.
///
/// Returns `None` when a component fails to parse numerically (e.g.
/// overflow); the caller falls back to string comparison.
fn compare_semver(a: &str, b: &str) -> Option<Ordering> {
    if a == b {
        return Some(Ordering::Equal);
    }

    let core_a = release_core(a);
    let core_b = release_core(b);
    let parts_a: Vec<&str> = core_a.split('.').collect();
    let parts_b: Vec<&str> = core_b.split('.').collect();

    for i in 0..parts_a.len().max(parts_b.len()) {
        let num_a: u64 = match parts_a.get(i) {
            Some(part) => part.parse().ok()?,
            None => 0,
        };
        let num_b: u64 = match parts_b.get(i) {
            Some(part) => part.parse().ok()?,
            None => 0,
        };
        if num_a != num_b {
            return Some(num_a.cmp(&num_b));
        }
    }

    let pre_a = prerelease(a);
    let pre_b = prerelease(b);

    // Release versions outrank prerelease versions of the same core.
    match (pre_a.is_empty(), pre_b.is_empty()) {
        (true, false) => Some(Ordering::Greater),
        (false, true) => Some(Ordering::Less),
        (true, true) => Some(Ordering::Equal),
        (false, false) => Some(compare_prerelease(pre_a, pre_b)),
    }
}

/// Dot-segment prerelease comparison: segments compare numerically when
/// both sides parse as integers, lexicographically otherwise. A missing
/// trailing segment is treated as the empty string.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let parts_a: Vec<&str> = a.split('.').collect();
    let parts_b: Vec<&str> = b.split('.').collect();

    for i in 0..parts_a.len().max(parts_b.len()) {
        let part_a = parts_a.get(i).copied().unwrap_or("");
        let part_b = parts_b.get(i).copied().unwrap_or("");

        let ordering = match (part_a.parse::<u64>(), part_b.parse::<u64>()) {
            (Ok(num_a), Ok(num_b)) => num_a.cmp(&num_b),
            _ => part_a.cmp(part_b),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// The `MAJOR.MINOR.PATCH` part, before any `-prerelease` or `+build`.
fn release_core(version: &str) -> &str {
    version
        .split(['-', '+'])
        .next()
        .unwrap_or(version)
}

/// The prerelease tag between `-` and any later `+build`, or `""`.
fn prerelease(version: &str) -> &str {
    match version.find('-') {
        Some(dash) => {
            let rest = &version[dash + 1..];
            match version[dash..].find('+') {
                Some(plus) => &version[dash + 1..dash + plus],
                None => rest,
            }
        }
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_ordering() {
        assert_eq!(
            compare_versions(Some("1.0.2"), Some("1.0.1")),
            Ordering::Greater
        );
        assert_eq!(
            compare_versions(Some("1.0.1"), Some("1.0.2")),
            Ordering::Less
        );
        assert_eq!(
            compare_versions(Some("1.0.1"), Some("1.0.1")),
            Ordering::Equal
        );
        assert_eq!(
            compare_versions(Some("2.0.0"), Some("1.99.99")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_none_handling() {
        assert_eq!(compare_versions(None, None), Ordering::Equal);
        assert_eq!(compare_versions(None, Some("1.0.0")), Ordering::Less);
        assert_eq!(compare_versions(Some("1.0.0"), None), Ordering::Greater);
    }

    #[test]
    fn test_release_beats_prerelease() {
        assert_eq!(
            compare_versions(Some("1.0.0"), Some("1.0.0-alpha")),
            Ordering::Greater
        );
        assert_eq!(
            compare_versions(Some("1.0.0-alpha"), Some("1.0.0")),
            Ordering::Less
        );
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert_eq!(
            compare_versions(Some("1.0.0+build"), Some("1.0.0")),
            Ordering::Equal
        );
        assert_eq!(
            compare_versions(Some("1.0.0+build.1"), Some("1.0.0+build.2")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_prerelease_segments() {
        assert_eq!(
            compare_versions(Some("1.0.0-alpha.2"), Some("1.0.0-alpha.10")),
            Ordering::Less
        );
        assert_eq!(
            compare_versions(Some("1.0.0-alpha"), Some("1.0.0-beta")),
            Ordering::Less
        );
        assert_eq!(
            compare_versions(Some("1.0.0-alpha"), Some("1.0.0-alpha.1")),
            Ordering::Less
        );
        assert_eq!(
            compare_versions(Some("1.0.0-rc.1"), Some("1.0.0-rc.1")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_semver_beats_non_semver() {
        assert_eq!(
            compare_versions(Some("1.0.0"), Some("1.2.x")),
            Ordering::Greater
        );
        assert_eq!(
            compare_versions(Some("unknown"), Some("0.0.1")),
            Ordering::Less
        );
        // Four-component versions are not semver.
        assert_eq!(
            compare_versions(Some("2.13.2"), Some("2.13.2.1")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_non_semver_string_fallback() {
        assert_eq!(compare_versions(Some("abc"), Some("abd")), Ordering::Less);
        assert_eq!(compare_versions(Some(""), Some("")), Ordering::Equal);
        assert_eq!(
            compare_versions(Some("2.15"), Some("2.14")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_overflow_falls_back_to_string_compare() {
        let huge = "99999999999999999999999.0.0";
        assert!(is_valid_semver(huge));
        assert_eq!(
            compare_versions(Some(huge), Some("9.0.0")),
            huge.cmp("9.0.0")
        );
    }

    #[test]
    fn test_is_valid_semver() {
        assert!(is_valid_semver("1.0.0"));
        assert!(is_valid_semver("1.0.0-alpha.1"));
        assert!(is_valid_semver("1.0.0+build"));
        assert!(is_valid_semver(" 1.0.0 "));
        assert!(!is_valid_semver("1.0"));
        assert!(!is_valid_semver("1.0.0.0"));
        assert!(!is_valid_semver("v1.0.0"));
        assert!(!is_valid_semver(""));
    }
}
