use std::collections::HashSet;

use crate::error::Error;
use crate::version::{Format, Version};

/// An immutable, ordered registry of declared versions plus an optional
/// synthetic head version.
///
/// Constructed once at startup by [`crate::VersionMigrationBuilder`] and never
/// mutated afterwards; every request-time lookup is a read against the
/// already-sorted `Vec`.
#[derive(Debug, Clone)]
pub struct VersionBundle {
    format: Format,
    versions: Vec<Version>,
    head: Option<Version>,
}

impl VersionBundle {
    /// Build a bundle from a non-empty, single-format set of versions.
    ///
    /// `include_head` synthesizes and appends [`Version::head`] unless it is
    /// `false`, matching the builder's `include_head` option.
    pub fn new(mut versions: Vec<Version>, include_head: bool) -> Result<Self, Error> {
        if versions.is_empty() {
            return Err(Error::EmptyBundle);
        }

        let format = versions[0].format();
        if let Some(mismatched) = versions.iter().find(|v| v.format() != format) {
            return Err(Error::MixedFormats {
                first: format,
                second: mismatched.format(),
            });
        }

        let mut seen = HashSet::new();
        for v in &versions {
            if !seen.insert(v.raw().to_string()) {
                return Err(Error::DuplicateVersion(v.raw().to_string()));
            }
        }

        versions.sort();

        let head = include_head.then(Version::head);

        Ok(Self {
            format,
            versions,
            head,
        })
    }

    /// The format shared by every declared version.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Declared versions, ascending, excluding the synthetic head.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// The synthetic head version, if one was requested.
    pub fn head_version(&self) -> Option<&Version> {
        self.head.as_ref()
    }

    /// Find a declared (non-head) version equal to `raw`.
    pub fn find_exact(&self, raw: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.raw() == raw)
    }

    /// The closest declared version strictly older than `version`, if any.
    pub fn closest_older_than(&self, version: &Version) -> Option<&Version> {
        self.versions.iter().rev().find(|v| v.is_older_than(version))
    }

    /// Declared version raw strings, ascending, for error messages.
    pub fn declared_raw(&self) -> Vec<String> {
        self.versions.iter().map(|v| v.raw().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn v(raw: &str) -> Version {
        Version::parse(raw, Format::Date).unwrap()
    }

    #[test]
    fn sorts_ascending() {
        let bundle =
            VersionBundle::new(vec![v("2025-06-01"), v("2025-01-01")], false).unwrap();
        assert_eq!(
            bundle.declared_raw(),
            vec!["2025-01-01".to_string(), "2025-06-01".to_string()]
        );
    }

    #[test]
    fn rejects_empty() {
        assert_matches!(VersionBundle::new(vec![], false), Err(Error::EmptyBundle));
    }

    #[test]
    fn rejects_duplicates() {
        let err = VersionBundle::new(vec![v("2025-01-01"), v("2025-01-01")], false).unwrap_err();
        assert_matches!(err, Error::DuplicateVersion(_));
    }

    #[test]
    fn rejects_mixed_formats() {
        let semver = Version::parse("1.0.0", Format::Semver).unwrap();
        let err = VersionBundle::new(vec![v("2025-01-01"), semver], false).unwrap_err();
        assert_matches!(err, Error::MixedFormats { .. });
    }

    #[test]
    fn synthesizes_head_when_requested() {
        let bundle = VersionBundle::new(vec![v("2025-01-01")], true).unwrap();
        assert!(bundle.head_version().is_some());
        assert!(bundle.head_version().unwrap().is_head());
    }

    #[test]
    fn closest_older_than() {
        let bundle =
            VersionBundle::new(vec![v("2025-01-01"), v("2025-06-01"), v("2025-09-01")], false)
                .unwrap();
        let probe = v("2025-07-01");
        assert_eq!(bundle.closest_older_than(&probe).unwrap().raw(), "2025-06-01");
    }
}
