use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

use crate::error::Error;

/// The format a [`Version`] is parsed and ordered in.
///
/// A bundle of versions must share exactly one format; mixing formats would
/// make the total order ambiguous (is semver `2.0.0` older or newer than the
/// date `2025-06-01`? there is no sensible answer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// `YYYY-MM-DD`, proleptic Gregorian calendar.
    Date,
    /// `[v]MAJOR.MINOR[.PATCH][-prerelease]`, standard semver precedence.
    Semver,
    /// An opaque token, ordered lexicographically.
    StringFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Parsed {
    Date(NaiveDate),
    Semver(semver::Version),
    StringFormat(String),
}

/// A single versioned point in a [`crate::VersionBundle`].
///
/// `Version` is cheap to clone and carries its own parsed representation so
/// that ordering never re-parses the raw string. The synthetic [`Version::head`]
/// compares strictly greater than every declared version, regardless of format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    raw: String,
    format: Format,
    parsed: Option<Parsed>,
    is_head: bool,
}

impl Version {
    /// Parse `raw` in the given `format`.
    pub fn parse(raw: impl Into<String>, format: Format) -> Result<Self, Error> {
        let raw = raw.into();
        let parsed = match format {
            Format::Date => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(Parsed::Date)
                .map_err(|e| Error::InvalidVersion {
                    raw: raw.clone(),
                    format,
                    cause: e.to_string(),
                })?,
            Format::Semver => semver::Version::parse(raw.trim_start_matches(['v', 'V']))
                .map(Parsed::Semver)
                .map_err(|e| Error::InvalidVersion {
                    raw: raw.clone(),
                    format,
                    cause: e.to_string(),
                })?,
            Format::StringFormat => Parsed::StringFormat(raw.clone()),
        };

        Ok(Self {
            raw,
            format,
            parsed: Some(parsed),
            is_head: false,
        })
    }

    /// The synthetic `head` version: compares greater than every non-head
    /// version regardless of format.
    pub fn head() -> Self {
        Self {
            raw: "head".to_string(),
            format: Format::StringFormat,
            parsed: None,
            is_head: true,
        }
    }

    /// The format this version was parsed in.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The original, unparsed token this version was constructed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `true` for the synthetic head version.
    pub fn is_head(&self) -> bool {
        self.is_head
    }

    pub fn is_older_than(&self, other: &Version) -> bool {
        self.cmp(other) == Ordering::Less
    }

    pub fn is_newer_than(&self, other: &Version) -> bool {
        self.cmp(other) == Ordering::Greater
    }

    /// Compare two versions. Panics if both are non-head and their formats
    /// differ; this should be unreachable once a [`crate::VersionBundle`] has
    /// validated its members, but guards against misuse of bare `Version`s.
    fn cmp(&self, other: &Version) -> Ordering {
        match (self.is_head, other.is_head) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                assert_eq!(
                    self.format, other.format,
                    "cannot compare versions of different formats"
                );
                match (&self.parsed, &other.parsed) {
                    (Some(Parsed::Date(a)), Some(Parsed::Date(b))) => a.cmp(b),
                    (Some(Parsed::Semver(a)), Some(Parsed::Semver(b))) => a.cmp(b),
                    (Some(Parsed::StringFormat(a)), Some(Parsed::StringFormat(b))) => a.cmp(b),
                    _ => unreachable!("non-head version always carries a parsed value"),
                }
            }
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        Version::cmp(self, other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn date_ordering() {
        let a = Version::parse("2025-01-01", Format::Date).unwrap();
        let b = Version::parse("2025-06-01", Format::Date).unwrap();
        assert!(a.is_older_than(&b));
        assert!(b.is_newer_than(&a));
    }

    #[test]
    fn semver_ordering_and_prefix() {
        let a = Version::parse("1.2.0", Format::Semver).unwrap();
        let b = Version::parse("v1.3.0", Format::Semver).unwrap();
        assert!(a.is_older_than(&b));
    }

    #[test]
    fn string_format_is_lexicographic() {
        let a = Version::parse("alpha", Format::StringFormat).unwrap();
        let b = Version::parse("beta", Format::StringFormat).unwrap();
        assert!(a.is_older_than(&b));
    }

    #[test]
    fn head_is_always_newest() {
        let a = Version::parse("2099-01-01", Format::Date).unwrap();
        let head = Version::head();
        assert!(a.is_older_than(&head));
        assert!(head.is_newer_than(&a));
    }

    #[test]
    fn invalid_date_is_rejected() {
        let err = Version::parse("not-a-date", Format::Date).unwrap_err();
        assert_matches!(err, Error::InvalidVersion { .. });
    }

    #[test]
    fn partial_semver_token_is_rejected_by_parse() {
        // Partial tokens ("1", "1.2") are handled at resolution time, not here.
        assert!(Version::parse("1", Format::Semver).is_err());
        assert!(Version::parse("1.2", Format::Semver).is_err());
    }
}
