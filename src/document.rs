//! An order-preserving JSON tree.
//!
//! Migration correctness depends on treating a JSON object as an *ordered*
//! mapping: [`crate::document::Node::Object`] is backed by an [`indexmap::IndexMap`],
//! whose iteration order always matches insertion order, rather than
//! `std::collections::HashMap`, whose order is unspecified. `set` updates a
//! key in place (keeping its position) and appends new keys at the tail;
//! `unset` shifts the remaining keys down rather than swapping the last key
//! into the removed slot, so order among the keys that remain is never
//! perturbed.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::error::Error;

/// A node in a parsed JSON tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(IndexMap<String, Node>),
    Array(Vec<Node>),
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

/// The type tag of a [`Node`], returned by [`Node::type_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Object => "object",
            NodeType::Array => "array",
            NodeType::String => "string",
            NodeType::Number => "number",
            NodeType::Bool => "bool",
            NodeType::Null => "null",
        };
        write!(f, "{s}")
    }
}

impl Node {
    pub fn type_of(&self) -> NodeType {
        match self {
            Node::Object(_) => NodeType::Object,
            Node::Array(_) => NodeType::Array,
            Node::String(_) => NodeType::String,
            Node::Number(_) => NodeType::Number,
            Node::Bool(_) => NodeType::Bool,
            Node::Null => NodeType::Null,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match self {
            Node::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// `get(k)` on an object node, `None` for any other node shape or a
    /// missing key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// `set(k, v)`: updates in place if `k` is already present (keeping its
    /// position), otherwise appends at the tail. A no-op on non-object nodes.
    pub fn set(&mut self, key: &str, value: Node) {
        if let Some(m) = self.as_object_mut() {
            if let Some(slot) = m.get_mut(key) {
                *slot = value;
            } else {
                m.insert(key.to_string(), value);
            }
        }
    }

    /// `unset(k)`: removes `k` if present, preserving the order of the
    /// remaining keys. A no-op (returning `None`) on a missing key or a
    /// non-object node.
    pub fn unset(&mut self, key: &str) -> Option<Node> {
        self.as_object_mut().and_then(|m| m.shift_remove(key))
    }

    /// `index(i)` on an array node.
    pub fn index(&self, i: usize) -> Option<&Node> {
        self.as_array().and_then(|a| a.get(i))
    }

    pub fn index_mut(&mut self, i: usize) -> Option<&mut Node> {
        self.as_array_mut().and_then(|a| a.get_mut(i))
    }

    /// Number of entries for an object or array, `0` otherwise.
    pub fn len(&self) -> usize {
        match self {
            Node::Object(m) => m.len(),
            Node::Array(a) => a.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep equality, used by `RemoveFieldIfDefault`.
    pub fn deep_eq(&self, other: &Node) -> bool {
        self == other
    }

    fn from_value(value: Value) -> Node {
        match value {
            Value::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, Node::from_value(v));
                }
                Node::Object(out)
            }
            Value::Array(items) => Node::Array(items.into_iter().map(Node::from_value).collect()),
            Value::String(s) => Node::String(s),
            Value::Number(n) => Node::Number(n),
            Value::Bool(b) => Node::Bool(b),
            Value::Null => Node::Null,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Node::Object(m) => {
                let mut map = Map::new();
                for (k, v) in m {
                    map.insert(k.clone(), v.to_value());
                }
                Value::Object(map)
            }
            Node::Array(a) => Value::Array(a.iter().map(Node::to_value).collect()),
            Node::String(s) => Value::String(s.clone()),
            Node::Number(n) => Value::Number(n.clone()),
            Node::Bool(b) => Value::Bool(*b),
            Node::Null => Value::Null,
        }
    }
}

/// A parsed JSON document: a [`Node`] tree rooted at either an object or an
/// array (a scalar-rooted body is accepted but offers no migration surface).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Parse a JSON body. Fails with [`Error::MalformedJson`] if `bytes` is
    /// not valid JSON.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::MalformedJson(e.to_string()))?;
        Ok(Self {
            root: Node::from_value(value),
        })
    }

    pub fn from_node(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// `true` when the document's root is a JSON array.
    pub fn is_array_root(&self) -> bool {
        self.root.is_array()
    }

    /// Serialize preserving insertion order of every object encountered.
    pub fn raw(&self) -> Vec<u8> {
        serde_json::to_vec(&self.root.to_value()).expect("Node serializes to valid JSON")
    }
}
