//! Per-route metadata resolved once at registration time, so the migration
//! engine never needs struct reflection on the hot path.

/// A dotted path to a field holding an array of objects, e.g. `"data.items"`.
/// Only object-array fields need declaring; scalar arrays are left alone by
/// the migration engine.
pub type FieldPath = String;

/// `"{METHOD} {pattern}"`, identifying one registered route, e.g.
/// `"GET /users/:id"`.
pub type RouteKey = String;

/// Metadata the builder pre-computes for one route so that
/// [`crate::change::VersionChange`] knows how to walk a request or response
/// body without consulting any type information at request time.
#[derive(Debug, Clone, Default)]
pub struct EndpointMeta {
    /// An opaque tag binding this route's body shape to a [`crate::change::OperationTarget::Schema`]
    /// entry, resolved at registration rather than via runtime type inspection.
    pub schema_tag: Option<String>,
    /// `true` when the body (request or response) is a JSON array at the
    /// root, so operations apply per-item rather than to the root object.
    pub array_root: bool,
    /// Dotted paths to nested fields that hold arrays of objects; operations
    /// targeting this route additionally descend into each one.
    pub object_array_paths: Vec<FieldPath>,
}

impl EndpointMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_tag(mut self, tag: impl Into<String>) -> Self {
        self.schema_tag = Some(tag.into());
        self
    }

    pub fn with_array_root(mut self, array_root: bool) -> Self {
        self.array_root = array_root;
        self
    }

    pub fn with_object_array_path(mut self, path: impl Into<String>) -> Self {
        self.object_array_paths.push(path.into());
        self
    }
}

pub fn route_key(method: &str, pattern: &str) -> RouteKey {
    format!("{} {}", method.to_uppercase(), pattern)
}
