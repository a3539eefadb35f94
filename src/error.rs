use thiserror::Error;

use crate::version::Format;

/// Errors produced while building a [`crate::VersionBundle`], a
/// [`crate::MigrationChain`], or a [`crate::VersionMigration`] layer, and while
/// migrating a single request or response at runtime.
///
/// Build-time variants (everything above [`Error::UnknownVersion`]) are meant to
/// abort process startup; request-time variants are caught by the pipeline and
/// turned into a structured 4xx/5xx response instead of propagating further.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid version '{raw}' for format {format:?}: {cause}")]
    InvalidVersion {
        raw: String,
        format: Format,
        cause: String,
    },

    #[error("version bundle must not be empty")]
    EmptyBundle,

    #[error("version bundle must not mix formats: found {first:?} and {second:?}")]
    MixedFormats { first: Format, second: Format },

    #[error("duplicate version '{0}' in bundle")]
    DuplicateVersion(String),

    #[error("cycle detected in migration chain: {0}")]
    CycleDetected(String),

    #[error("duplicate edge '{from}' -> '{to}' in migration chain")]
    DuplicateEdge { from: String, to: String },

    #[error("change endpoint '{0}' is not a member of the version bundle")]
    UnknownEndpoint(String),

    #[error("version change from '{from}' to '{to}' must move forward")]
    NonMonotonicEdge { from: String, to: String },

    #[error("version change from '{from}' to '{to}' needs at least one operation or a custom transformer")]
    EmptyChange { from: String, to: String },

    #[error("unknown version '{candidate}', available versions: {}", .available.join(", "))]
    UnknownVersion {
        candidate: String,
        available: Vec<String>,
    },

    #[error("malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("operation {op} on field '{field}' failed: {cause}")]
    OperationFailed {
        op: &'static str,
        field: String,
        cause: String,
    },

    #[error("no migration path from '{from}' to '{to}'")]
    NoPath { from: String, to: String },
}

impl Error {
    /// `true` for errors that should abort process startup rather than be
    /// surfaced per-request.
    pub fn is_build_time(&self) -> bool {
        !matches!(
            self,
            Error::UnknownVersion { .. } | Error::MalformedJson(_) | Error::OperationFailed { .. } | Error::NoPath { .. }
        )
    }
}
