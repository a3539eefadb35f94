//! One edge between two adjacent [`crate::Version`]s, carrying the operation
//! lists that migrate a request forward and a response backward across it.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Node, NodeType};
use crate::endpoint::{EndpointMeta, RouteKey};
use crate::error::Error;
use crate::operations::FieldOperation;
use crate::request::{RequestInfo, ResponseInfo};
use crate::version::Version;

/// What a `(target, operations)` entry in a [`VersionChange`] applies to:
/// either an opaque schema tag resolved at registration, or a path pattern
/// matched against the endpoint's declared route (`:id` / `*rest` segments).
#[derive(Debug, Clone)]
pub enum OperationTarget {
    Schema(String),
    Path(String),
}

impl OperationTarget {
    fn matches(&self, route_key: &RouteKey, meta: &EndpointMeta) -> bool {
        match self {
            OperationTarget::Schema(tag) => meta.schema_tag.as_deref() == Some(tag.as_str()),
            OperationTarget::Path(pattern) => {
                let path = route_key.split_once(' ').map(|(_, p)| p).unwrap_or(route_key);
                path == pattern || compile_pattern(pattern).is_match(path)
            }
        }
    }
}

fn compile_pattern(pattern: &str) -> Regex {
    let mut out = String::from("^");
    for segment in pattern.split('/') {
        if segment.is_empty() {
            continue;
        }
        out.push('/');
        if let Some(_name) = segment.strip_prefix(':') {
            out.push_str("[^/]+");
        } else if let Some(_name) = segment.strip_prefix('*') {
            out.push_str(".*");
        } else {
            out.push_str(&regex::escape(segment));
        }
    }
    out.push('$');
    Regex::new(&out).expect("compiled path pattern is a valid regex")
}

type Entries = Vec<(OperationTarget, Vec<FieldOperation>)>;

/// A directed edge `from -> to` carrying request-forward and
/// response-backward operation lists.
#[derive(Clone)]
pub struct VersionChange {
    from: Version,
    to: Version,
    description: String,
    hidden_from_changelog: bool,
    migrate_http_errors: bool,
    request_to_next: Entries,
    response_to_previous: Entries,
}

impl VersionChange {
    pub fn builder(from: Version, to: Version, description: impl Into<String>) -> VersionChangeBuilder {
        VersionChangeBuilder {
            from,
            to,
            description: description.into(),
            hidden_from_changelog: false,
            migrate_http_errors: true,
            request_to_next: Vec::new(),
            response_to_previous: Vec::new(),
        }
    }

    pub fn from(&self) -> &Version {
        &self.from
    }

    pub fn to(&self) -> &Version {
        &self.to
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hidden_from_changelog(&self) -> bool {
        self.hidden_from_changelog
    }

    /// Construct a change without the `from < to` guard, used only to feed
    /// [`crate::chain::MigrationChain`]'s cycle detector a graph that could
    /// never otherwise exist — every edge built through
    /// [`VersionChangeBuilder`] is monotonic, so real cycles cannot occur.
    #[cfg(test)]
    pub(crate) fn unchecked(from: Version, to: Version, description: impl Into<String>) -> Self {
        VersionChange {
            from,
            to,
            description: description.into(),
            hidden_from_changelog: false,
            migrate_http_errors: true,
            request_to_next: vec![(
                OperationTarget::Path("/x".into()),
                vec![FieldOperation::remove_field("x")],
            )],
            response_to_previous: Vec::new(),
        }
    }

    pub fn migrate_http_errors(&self) -> bool {
        self.migrate_http_errors
    }

    fn cache_key(&self, target: &OperationTarget, forward: bool) -> String {
        format!("{}:{:?}:{:?}", self.description, forward, target)
    }

    fn select<'a>(
        &'a self,
        entries: &'a Entries,
        route_key: &RouteKey,
        meta: &EndpointMeta,
        cache: &mut HashMap<String, bool>,
        forward: bool,
    ) -> Vec<&'a FieldOperation> {
        entries
            .iter()
            .filter(|(target, _)| {
                let key = self.cache_key(target, forward);
                *cache
                    .entry(key)
                    .or_insert_with(|| target.matches(route_key, meta))
            })
            .flat_map(|(_, ops)| ops.iter())
            .collect()
    }

    /// Apply the request-forward operations for this edge to `request`,
    /// per §4.E.2: at the array root if `meta.array_root`, otherwise at the
    /// root object, plus every declared nested object-array path.
    pub fn apply_request(&self, request: &mut RequestInfo, meta: &EndpointMeta) -> Result<(), Error> {
        let ops = self.select(
            &self.request_to_next,
            &request.route_key,
            meta,
            &mut request.match_cache,
            true,
        );
        apply_ops_to_body(request.body.root_mut(), &ops, meta).map_err(|e| wrap(e, &self.description))
    }

    /// Apply the response-backward operations for this edge to `response`,
    /// per §4.E.3.
    pub fn apply_response(&self, response: &mut ResponseInfo, meta: &EndpointMeta) -> Result<(), Error> {
        if !self.migrate_http_errors && response.status >= 300 {
            return Ok(());
        }

        let ops = self.select(
            &self.response_to_previous,
            &response.route_key,
            meta,
            &mut response.match_cache,
            false,
        );
        apply_ops_to_body(response.body.root_mut(), &ops, meta).map_err(|e| wrap(e, &self.description))?;

        if response.status == 400 {
            let renames: Vec<(String, String)> = ops
                .iter()
                .filter_map(|op| match op {
                    FieldOperation::RenameField { from, to } => Some((from.clone(), to.clone())),
                    _ => None,
                })
                .collect();
            if !renames.is_empty() {
                rewrite_error_messages(response.body.root_mut(), &renames);
            }
        }

        Ok(())
    }
}

fn wrap(error: Error, description: &str) -> Error {
    match error {
        Error::OperationFailed { op, field, cause } => Error::OperationFailed {
            op,
            field,
            cause: format!("{description}: {cause}"),
        },
        other => other,
    }
}

fn apply_ops_to_body(root: &mut Node, ops: &[&FieldOperation], meta: &EndpointMeta) -> Result<(), Error> {
    if ops.is_empty() && meta.object_array_paths.is_empty() {
        return Ok(());
    }

    if meta.array_root {
        if let Some(items) = root.as_array_mut() {
            for item in items {
                apply_ops_to_object(item, ops)?;
            }
        }
    } else {
        apply_ops_to_object(root, ops)?;
    }

    for path in &meta.object_array_paths {
        if let Some(node) = navigate(root, path) {
            if let Some(items) = node.as_array_mut() {
                for item in items {
                    apply_ops_to_object(item, ops)?;
                }
            }
        }
    }

    Ok(())
}

fn apply_ops_to_object(node: &mut Node, ops: &[&FieldOperation]) -> Result<(), Error> {
    for op in ops {
        op.apply(node)?;
    }
    Ok(())
}

fn navigate<'a>(root: &'a mut Node, dotted_path: &str) -> Option<&'a mut Node> {
    let mut current = root;
    for segment in dotted_path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    if current.type_of() == NodeType::Array {
        Some(current)
    } else {
        None
    }
}

static PASCAL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-]+").expect("pascal-case boundary regex is valid"));

fn to_pascal_case(field: &str) -> String {
    PASCAL_BOUNDARY
        .split(field)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Rewrite validation-error message text so older clients see their own
/// field names instead of the head contract's, per §4.E.3. Substitutes four
/// shapes per `(new_name, old_name)` pair: bare token, PascalCase token,
/// single-quoted, double-quoted.
fn rewrite_error_messages(node: &mut Node, renames: &[(String, String)]) {
    match node {
        Node::String(s) => {
            for (new_name, old_name) in renames {
                let new_pascal = to_pascal_case(new_name);
                let old_pascal = to_pascal_case(old_name);
                *s = s
                    .replace(&format!("'{new_name}'"), &format!("'{old_name}'"))
                    .replace(&format!("\"{new_name}\""), &format!("\"{old_name}\""))
                    .replace(&new_pascal, &old_pascal)
                    .replace(new_name.as_str(), old_name.as_str());
            }
        }
        Node::Object(map) => {
            for value in map.values_mut() {
                rewrite_error_messages(value, renames);
            }
        }
        Node::Array(items) => {
            for item in items {
                rewrite_error_messages(item, renames);
            }
        }
        _ => {}
    }
}

/// Builds a [`VersionChange`], validating it per §4.E.1.
pub struct VersionChangeBuilder {
    from: Version,
    to: Version,
    description: String,
    hidden_from_changelog: bool,
    migrate_http_errors: bool,
    request_to_next: Entries,
    response_to_previous: Entries,
}

impl VersionChangeBuilder {
    pub fn request_ops(mut self, target: OperationTarget, ops: Vec<FieldOperation>) -> Self {
        self.request_to_next.push((target, ops));
        self
    }

    pub fn response_ops(mut self, target: OperationTarget, ops: Vec<FieldOperation>) -> Self {
        self.response_to_previous.push((target, ops));
        self
    }

    pub fn hidden_from_changelog(mut self, hidden: bool) -> Self {
        self.hidden_from_changelog = hidden;
        self
    }

    pub fn migrate_http_errors(mut self, enabled: bool) -> Self {
        self.migrate_http_errors = enabled;
        self
    }

    pub fn build(self) -> Result<VersionChange, Error> {
        if !self.from.is_older_than(&self.to) {
            return Err(Error::NonMonotonicEdge {
                from: self.from.raw().to_string(),
                to: self.to.raw().to_string(),
            });
        }

        let has_any_ops = self
            .request_to_next
            .iter()
            .chain(self.response_to_previous.iter())
            .any(|(_, ops)| !ops.is_empty());
        if !has_any_ops {
            return Err(Error::EmptyChange {
                from: self.from.raw().to_string(),
                to: self.to.raw().to_string(),
            });
        }

        Ok(VersionChange {
            from: self.from,
            to: self.to,
            description: self.description,
            hidden_from_changelog: self.hidden_from_changelog,
            migrate_http_errors: self.migrate_http_errors,
            request_to_next: self.request_to_next,
            response_to_previous: self.response_to_previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Format;

    fn v(raw: &str) -> Version {
        Version::parse(raw, Format::Date).unwrap()
    }

    #[test]
    fn rejects_non_monotonic_edge() {
        let err = VersionChange::builder(v("2025-06-01"), v("2025-01-01"), "bad")
            .request_ops(OperationTarget::Path("/users".into()), vec![FieldOperation::remove_field("x")])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::NonMonotonicEdge { .. }));
    }

    #[test]
    fn rejects_empty_change() {
        let err = VersionChange::builder(v("2025-01-01"), v("2025-06-01"), "empty")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::EmptyChange { .. }));
    }

    #[test]
    fn path_pattern_matches_param_segment() {
        let meta = EndpointMeta::new();
        let target = OperationTarget::Path("/users/:id".to_string());
        assert!(target.matches(&"GET /users/:id".to_string(), &meta));
        assert!(!target.matches(&"GET /orders/:id".to_string(), &meta));
    }

    #[test]
    fn schema_tag_matches_endpoint_metadata() {
        let meta = EndpointMeta::new().with_schema_tag("User");
        let target = OperationTarget::Schema("User".to_string());
        assert!(target.matches(&"GET /users".to_string(), &meta));
    }

    #[test]
    fn to_pascal_case_splits_on_underscore() {
        assert_eq!(to_pascal_case("full_name"), "FullName");
        assert_eq!(to_pascal_case("name"), "Name");
    }

    #[test]
    fn rewrite_error_messages_substitutes_all_four_shapes() {
        let mut node = Node::Object(indexmap::IndexMap::from([(
            "error".to_string(),
            Node::String(
                "field full_name is invalid, see 'full_name', \"full_name\", FullName".to_string(),
            ),
        )]));
        rewrite_error_messages(&mut node, &[("full_name".to_string(), "name".to_string())]);
        let message = node.get("error").unwrap().as_str().unwrap();
        assert!(message.contains("field name is invalid"));
        assert!(message.contains("'name'"));
        assert!(message.contains("\"name\""));
        assert!(message.contains("Name"));
        assert!(!message.contains("full_name"));
    }

    #[test]
    fn custom_only_change_satisfies_the_has_any_ops_check() {
        let change = VersionChange::builder(v("2025-01-01"), v("2025-06-01"), "custom only")
            .request_ops(
                OperationTarget::Path("/users".into()),
                vec![FieldOperation::custom("noop", |_node| Ok(()))],
            )
            .build();
        assert!(change.is_ok());
    }

    #[test]
    fn apply_response_rewrites_rename_in_a_400_error_message() {
        use crate::document::Document;
        use axum::http::HeaderMap;

        let change = VersionChange::builder(v("2025-01-01"), v("2025-06-01"), "rename full_name")
            .response_ops(
                OperationTarget::Path("/users".into()),
                vec![FieldOperation::rename_field("full_name", "display_name")],
            )
            .build()
            .unwrap();

        let doc = Document::parse(br#"{"error":"field 'display_name' is invalid"}"#).unwrap();
        let mut response = ResponseInfo::new(doc, 400, HeaderMap::new(), "POST /users".to_string());
        let meta = EndpointMeta::new();
        change.apply_response(&mut response, &meta).unwrap();

        let message = response.body.root().get("error").unwrap().as_str().unwrap();
        assert!(message.contains("'full_name'"));
        assert!(!message.contains("display_name"));
    }

    #[test]
    fn apply_response_skips_non_2xx_when_migrate_http_errors_is_disabled() {
        use crate::document::Document;
        use axum::http::HeaderMap;

        let change = VersionChange::builder(v("2025-01-01"), v("2025-06-01"), "rename full_name")
            .response_ops(
                OperationTarget::Path("/users".into()),
                vec![FieldOperation::rename_field("full_name", "display_name")],
            )
            .migrate_http_errors(false)
            .build()
            .unwrap();

        let doc = Document::parse(br#"{"error":"field 'display_name' is invalid"}"#).unwrap();
        let mut response = ResponseInfo::new(doc, 400, HeaderMap::new(), "POST /users".to_string());
        let meta = EndpointMeta::new();
        change.apply_response(&mut response, &meta).unwrap();

        let message = response.body.root().get("error").unwrap().as_str().unwrap();
        assert!(message.contains("display_name"));
    }
}
