//! Extracts and resolves a client's API version token from a request: header
//! first, then a path-embedded version segment, per §4.G.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName};
use regex::Regex;

use crate::bundle::VersionBundle;
use crate::error::Error;
use crate::version::{Format, Version};

static PATH_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([vV]?\d+(?:[.\-]\w+)*)/").expect("path version regex is valid"));

/// The outcome of resolving a client's version token.
pub struct Resolved {
    pub version: Version,
    /// `true` when no candidate token was present and `default_version` (or
    /// the head version) was used instead.
    pub default_used: bool,
}

/// Extracts a version token from a request and resolves it against a
/// [`VersionBundle`], per the header-then-path priority rule and the
/// exact/head/partial/waterfall resolution ladder.
pub struct VersionManager {
    header_name: HeaderName,
    default_version: Option<Version>,
}

impl VersionManager {
    pub fn new(parameter_name: &str, default_version: Option<Version>) -> Self {
        let header_name = HeaderName::try_from(parameter_name).unwrap_or_else(|_| {
            HeaderName::from_static("x-api-version")
        });
        Self {
            header_name,
            default_version,
        }
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Extract a candidate token: the header wins when present (first value),
    /// else the first match group of the path-embedded version regex.
    pub fn extract_token(&self, headers: &HeaderMap, path: &str) -> Option<String> {
        if let Some(value) = headers.get(&self.header_name).and_then(|v| v.to_str().ok()) {
            return Some(value.to_string());
        }

        let padded = format!("/{}", path.trim_start_matches('/'));
        PATH_VERSION
            .captures(&padded)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Resolve a candidate token (or `None`, meaning "no token present")
    /// against `bundle`, per the resolution ladder in §4.G.
    pub fn resolve(&self, candidate: Option<&str>, bundle: &VersionBundle) -> Result<Resolved, Error> {
        let Some(candidate) = candidate else {
            let version = self
                .default_version
                .clone()
                .or_else(|| bundle.head_version().cloned())
                .or_else(|| bundle.versions().last().cloned())
                .ok_or_else(|| Error::UnknownVersion {
                    candidate: String::new(),
                    available: bundle.declared_raw(),
                })?;
            return Ok(Resolved {
                version,
                default_used: true,
            });
        };

        if let Some(exact) = bundle.find_exact(candidate) {
            return Ok(Resolved {
                version: exact.clone(),
                default_used: false,
            });
        }

        if candidate.eq_ignore_ascii_case("head") {
            if let Some(head) = bundle.head_version() {
                return Ok(Resolved {
                    version: head.clone(),
                    default_used: false,
                });
            }
        }

        if bundle.format() == Format::Semver {
            if let Some(version) = partial_match(candidate, bundle) {
                return Ok(Resolved {
                    version: version.clone(),
                    default_used: false,
                });
            }
        }

        if let Ok(well_formed) = Version::parse(candidate, bundle.format()) {
            if let Some(older) = bundle.closest_older_than(&well_formed) {
                return Ok(Resolved {
                    version: older.clone(),
                    default_used: false,
                });
            }
        }

        Err(Error::UnknownVersion {
            candidate: candidate.to_string(),
            available: bundle.declared_raw(),
        })
    }
}

/// Pick the latest declared version whose normalized raw string is prefixed
/// by `candidate` at a dot boundary (`"1"` matches `"1.2.0"`, `"1.2"`
/// matches `"1.2.0"` but not `"1.20.0"`).
fn partial_match<'a>(candidate: &str, bundle: &'a VersionBundle) -> Option<&'a Version> {
    let normalized = candidate.trim_start_matches(['v', 'V']);

    bundle
        .versions()
        .iter()
        .filter(|v| {
            let raw = v.raw().trim_start_matches(['v', 'V']);
            raw == normalized || raw.starts_with(&format!("{normalized}."))
        })
        .max_by(|a, b| a.cmp(b))
}
