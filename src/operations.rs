//! Declarative field operations that implement both directions of a
//! [`crate::VersionChange`] edge.
//!
//! Every operation is a no-op on a non-object node (arrays and scalars are
//! handled by the traversal helpers in [`crate::change`], not here) and never
//! fails on a missing field — only [`Error::OperationFailed`] for an
//! underlying document mutation failure propagates.

use std::fmt;
use std::sync::Arc;

use crate::document::Node;
use crate::error::Error;

/// A single declarative transformation of an object node.
#[derive(Clone)]
pub enum FieldOperation {
    /// Insert `name` with `default` at the tail if absent.
    AddField { name: String, default: Node },
    /// Identical to [`FieldOperation::AddField`]; kept as a distinct variant
    /// so authors can express intent ("this restores a default" vs. "this
    /// adds a brand-new field").
    AddFieldWithDefault { name: String, default: Node },
    /// Remove `name`; a no-op if absent.
    RemoveField { name: String },
    /// If `from` is present, set `to` to its value then remove `from`. The
    /// value reappears at the tail under the new name — position is not
    /// preserved. A no-op if `from` is absent.
    RenameField { from: String, to: String },
    /// Remove `name` only if present and deep-equal to `default`.
    RemoveFieldIfDefault { name: String, default: Node },
    /// An opaque transformation; not auto-invertible.
    Custom {
        label: &'static str,
        apply: Arc<dyn Fn(&mut Node) -> Result<(), Error> + Send + Sync>,
    },
}

impl fmt::Debug for FieldOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldOperation::AddField { name, .. } => {
                f.debug_struct("AddField").field("name", name).finish()
            }
            FieldOperation::AddFieldWithDefault { name, .. } => f
                .debug_struct("AddFieldWithDefault")
                .field("name", name)
                .finish(),
            FieldOperation::RemoveField { name } => {
                f.debug_struct("RemoveField").field("name", name).finish()
            }
            FieldOperation::RenameField { from, to } => f
                .debug_struct("RenameField")
                .field("from", from)
                .field("to", to)
                .finish(),
            FieldOperation::RemoveFieldIfDefault { name, .. } => f
                .debug_struct("RemoveFieldIfDefault")
                .field("name", name)
                .finish(),
            FieldOperation::Custom { label, .. } => {
                f.debug_struct("Custom").field("label", label).finish()
            }
        }
    }
}

impl FieldOperation {
    pub fn add_field(name: impl Into<String>, default: Node) -> Self {
        FieldOperation::AddField {
            name: name.into(),
            default,
        }
    }

    pub fn add_field_with_default(name: impl Into<String>, default: Node) -> Self {
        FieldOperation::AddFieldWithDefault {
            name: name.into(),
            default,
        }
    }

    pub fn remove_field(name: impl Into<String>) -> Self {
        FieldOperation::RemoveField { name: name.into() }
    }

    pub fn rename_field(from: impl Into<String>, to: impl Into<String>) -> Self {
        FieldOperation::RenameField {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn remove_field_if_default(name: impl Into<String>, default: Node) -> Self {
        FieldOperation::RemoveFieldIfDefault {
            name: name.into(),
            default,
        }
    }

    pub fn custom(
        label: &'static str,
        apply: impl Fn(&mut Node) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Self {
        FieldOperation::Custom {
            label,
            apply: Arc::new(apply),
        }
    }

    /// A human-readable operation name, used in [`Error::OperationFailed`].
    pub fn name(&self) -> &'static str {
        match self {
            FieldOperation::AddField { .. } => "AddField",
            FieldOperation::AddFieldWithDefault { .. } => "AddFieldWithDefault",
            FieldOperation::RemoveField { .. } => "RemoveField",
            FieldOperation::RenameField { .. } => "RenameField",
            FieldOperation::RemoveFieldIfDefault { .. } => "RemoveFieldIfDefault",
            FieldOperation::Custom { .. } => "Custom",
        }
    }

    /// Apply this operation to an object node. A no-op on an array or scalar
    /// node; callers needing per-item application over an array descend
    /// first (see [`crate::change::VersionChange`]).
    pub fn apply(&self, node: &mut Node) -> Result<(), Error> {
        if !node.is_object() {
            return Ok(());
        }

        match self {
            FieldOperation::AddField { name, default }
            | FieldOperation::AddFieldWithDefault { name, default } => {
                if node.get(name).is_none() {
                    node.set(name, default.clone());
                }
                Ok(())
            }
            FieldOperation::RemoveField { name } => {
                node.unset(name);
                Ok(())
            }
            FieldOperation::RenameField { from, to } => {
                if let Some(value) = node.get(from).cloned() {
                    node.set(to, value);
                    node.unset(from);
                }
                Ok(())
            }
            FieldOperation::RemoveFieldIfDefault { name, default } => {
                if matches!(node.get(name), Some(existing) if existing.deep_eq(default)) {
                    node.unset(name);
                }
                Ok(())
            }
            FieldOperation::Custom { label, apply } => apply(node).map_err(|e| Error::OperationFailed {
                op: "Custom",
                field: (*label).to_string(),
                cause: e.to_string(),
            }),
        }
    }

    /// The inverse operation, where one exists. `RemoveFieldIfDefault` and
    /// `Custom` are not auto-invertible and return `None`.
    pub fn inverse(&self) -> Option<FieldOperation> {
        match self {
            FieldOperation::AddField { name, .. } => Some(FieldOperation::remove_field(name)),
            FieldOperation::AddFieldWithDefault { name, .. } => {
                Some(FieldOperation::remove_field(name))
            }
            FieldOperation::RemoveField { name } => {
                Some(FieldOperation::add_field(name, Node::Null))
            }
            FieldOperation::RenameField { from, to } => {
                Some(FieldOperation::rename_field(to, from))
            }
            FieldOperation::RemoveFieldIfDefault { .. } => None,
            FieldOperation::Custom { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn obj(pairs: &[(&str, Node)]) -> Node {
        let mut map = IndexMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        Node::Object(map)
    }

    #[test]
    fn add_field_inserts_when_absent() {
        let mut node = obj(&[("a", Node::Bool(true))]);
        FieldOperation::add_field("b", Node::Null).apply(&mut node).unwrap();
        assert!(node.get("b").is_some());
    }

    #[test]
    fn add_field_is_noop_when_present() {
        let mut node = obj(&[("a", Node::String("orig".into()))]);
        FieldOperation::add_field("a", Node::String("new".into()))
            .apply(&mut node)
            .unwrap();
        assert_eq!(node.get("a").unwrap().as_str(), Some("orig"));
    }

    #[test]
    fn remove_field_absent_is_noop() {
        let mut node = obj(&[]);
        FieldOperation::remove_field("missing").apply(&mut node).unwrap();
    }

    #[test]
    fn rename_field_moves_value_to_tail() {
        let mut node = obj(&[("name", Node::String("Alice".into())), ("age", Node::Number(3.into()))]);
        FieldOperation::rename_field("name", "full_name")
            .apply(&mut node)
            .unwrap();
        let keys: Vec<_> = node.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["age".to_string(), "full_name".to_string()]);
    }

    #[test]
    fn rename_field_absent_source_is_silent_noop() {
        let mut node = obj(&[("age", Node::Number(3.into()))]);
        FieldOperation::rename_field("missing", "renamed")
            .apply(&mut node)
            .unwrap();
        assert!(node.get("renamed").is_none());
        assert_eq!(node.len(), 1);
    }

    #[test]
    fn remove_field_if_default_matches() {
        let mut node = obj(&[("count", Node::Number(0.into()))]);
        FieldOperation::remove_field_if_default("count", Node::Number(0.into()))
            .apply(&mut node)
            .unwrap();
        assert!(node.get("count").is_none());
    }

    #[test]
    fn remove_field_if_default_mismatch_keeps_field() {
        let mut node = obj(&[("count", Node::Number(5.into()))]);
        FieldOperation::remove_field_if_default("count", Node::Number(0.into()))
            .apply(&mut node)
            .unwrap();
        assert!(node.get("count").is_some());
    }

    #[test]
    fn operations_are_idempotent() {
        let mut node = obj(&[("a", Node::Bool(true))]);
        let op = FieldOperation::add_field("b", Node::Null);
        op.apply(&mut node).unwrap();
        op.apply(&mut node).unwrap();
        assert_eq!(node.len(), 2);
    }

    #[test]
    fn inverse_table() {
        assert!(matches!(
            FieldOperation::add_field("a", Node::Null).inverse(),
            Some(FieldOperation::RemoveField { .. })
        ));
        assert!(matches!(
            FieldOperation::remove_field("a").inverse(),
            Some(FieldOperation::AddField { .. })
        ));
        assert!(matches!(
            FieldOperation::rename_field("a", "b").inverse(),
            Some(FieldOperation::RenameField { .. })
        ));
        assert!(FieldOperation::remove_field_if_default("a", Node::Null)
            .inverse()
            .is_none());
    }

    #[test]
    fn forward_then_inverse_round_trips_modulo_rename_position() {
        let mut node = obj(&[("email", Node::String("x@example.com".into()))]);
        let add = FieldOperation::add_field("phone", Node::String(String::new()));
        add.apply(&mut node).unwrap();
        add.inverse().unwrap().apply(&mut node).unwrap();
        assert!(node.get("phone").is_none());
        assert!(node.get("email").is_some());
    }

    #[test]
    fn custom_applies_an_opaque_transformation() {
        let op = FieldOperation::custom("uppercase_name", |node| {
            if let Some(Node::String(name)) = node.get("name").cloned() {
                node.set("name", Node::String(name.to_uppercase()));
            }
            Ok(())
        });
        let mut node = obj(&[("name", Node::String("ada".into()))]);
        op.apply(&mut node).unwrap();
        assert_eq!(node.get("name").unwrap().as_str(), Some("ADA"));
    }

    #[test]
    fn custom_failure_is_wrapped_as_operation_failed() {
        let op = FieldOperation::custom("always_fails", |_node| {
            Err(Error::MalformedJson("boom".to_string()))
        });
        let mut node = obj(&[("name", Node::String("ada".into()))]);
        let err = op.apply(&mut node).unwrap_err();
        assert!(matches!(err, Error::OperationFailed { op: "Custom", .. }));
    }

    #[test]
    fn custom_is_not_auto_invertible() {
        let op = FieldOperation::custom("uppercase_name", |_node| Ok(()));
        assert!(op.inverse().is_none());
    }
}
