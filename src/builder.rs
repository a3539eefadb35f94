//! Assembles a [`VersionBundle`], [`MigrationChain`], [`VersionManager`], and
//! endpoint registry from user-supplied versions and changes, validating all
//! invariants, per §4.I.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bundle::VersionBundle;
use crate::chain::MigrationChain;
use crate::change::VersionChange;
use crate::endpoint::{EndpointMeta, RouteKey};
use crate::error::Error;
use crate::manager::VersionManager;
use crate::pipeline::{Shared, VersionMigrationLayer};
use crate::version::{Format, Version};

const DEFAULT_PARAMETER: &str = "x-api-version";

/// Builds a [`VersionMigrationLayer`] from declared versions, changes, and
/// per-route metadata.
pub struct VersionMigrationBuilder {
    format: Format,
    versions: Vec<Version>,
    changes: Vec<VersionChange>,
    version_parameter: String,
    default_version: Option<Version>,
    include_head: bool,
    endpoints: HashMap<RouteKey, EndpointMeta>,
}

impl VersionMigrationBuilder {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            versions: Vec::new(),
            changes: Vec::new(),
            version_parameter: DEFAULT_PARAMETER.to_string(),
            default_version: None,
            include_head: true,
            endpoints: HashMap::new(),
        }
    }

    /// Declare one version, parsed in the builder's format.
    pub fn version(mut self, raw: &str) -> Result<Self, Error> {
        self.versions.push(Version::parse(raw, self.format)?);
        Ok(self)
    }

    /// Declare several versions at once.
    pub fn versions<I, S>(mut self, raws: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in raws {
            self.versions.push(Version::parse(raw.as_ref(), self.format)?);
        }
        Ok(self)
    }

    /// Add one migration edge.
    pub fn change(mut self, change: VersionChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Add several migration edges at once.
    pub fn changes(mut self, changes: impl IntoIterator<Item = VersionChange>) -> Self {
        self.changes.extend(changes);
        self
    }

    /// The header name and URL keyword carrying the version token. Default
    /// `x-api-version`.
    pub fn version_parameter(mut self, name: impl Into<String>) -> Self {
        self.version_parameter = name.into();
        self
    }

    /// The version to use when a request carries no token. Defaults to head.
    pub fn default_version(mut self, raw: &str) -> Result<Self, Error> {
        self.default_version = Some(Version::parse(raw, self.format)?);
        Ok(self)
    }

    /// Whether to synthesize a head version. Default `true`.
    pub fn include_head(mut self, include: bool) -> Self {
        self.include_head = include;
        self
    }

    /// Attach metadata (schema tag, array shape) for one registered route.
    pub fn endpoint(mut self, route_key: impl Into<String>, meta: EndpointMeta) -> Self {
        self.endpoints.insert(route_key.into(), meta);
        self
    }

    /// Validate every invariant and assemble the [`VersionMigrationLayer`].
    pub fn build(self) -> Result<VersionMigrationLayer, Error> {
        let bundle = VersionBundle::new(self.versions, self.include_head)?;
        let chain = MigrationChain::new(self.changes, &bundle)?;
        let manager = VersionManager::new(&self.version_parameter, self.default_version);

        Ok(VersionMigrationLayer {
            shared: Arc::new(Shared {
                bundle,
                chain,
                manager,
                endpoints: self.endpoints,
            }),
        })
    }
}
