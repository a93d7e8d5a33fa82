//! The universal tagged value tree used for resource specs, values,
//! metadata, and include variables.
//!
//! Nodes are constructed upstream by the parser and treated as read-only
//! here; validation never mutates a tree. [`MappingNode::from_json`] exists
//! for embedders and tests that assemble trees programmatically; positions
//! on such trees are absent and degrade to the parent's, marked approximate.
use crate::{
    positions::SourceRange,
    scalar::ScalarValue,
    substitutions::StringWithSubstitutions,
};
use serde_json::Value;

/// One field of an object node, carrying the key's own source position so
/// diagnostics can anchor on the key rather than the value.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub key: String,
    pub key_range: Option<SourceRange>,
    pub value: MappingNode,
}

impl MappingEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, value: MappingNode) -> MappingEntry {
        MappingEntry {
            key: key.into(),
            key_range: None,
            value,
        }
    }

    #[must_use]
    pub fn with_key_range(mut self, range: SourceRange) -> MappingEntry {
        self.key_range = Some(range);
        self
    }
}

/// A node in a mapping tree. Exactly one variant is populated; `Null` is the
/// empty node.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingNode {
    Null {
        range: Option<SourceRange>,
    },
    Scalar {
        value: ScalarValue,
        range: Option<SourceRange>,
    },
    Object {
        entries: Vec<MappingEntry>,
        range: Option<SourceRange>,
    },
    Array {
        items: Vec<MappingNode>,
        range: Option<SourceRange>,
    },
    Interpolation {
        value: StringWithSubstitutions,
        range: Option<SourceRange>,
    },
}

impl MappingNode {
    #[must_use]
    pub const fn null() -> MappingNode {
        MappingNode::Null { range: None }
    }

    #[must_use]
    pub fn scalar(value: impl Into<ScalarValue>) -> MappingNode {
        MappingNode::Scalar {
            value: value.into(),
            range: None,
        }
    }

    #[must_use]
    pub fn object(entries: Vec<MappingEntry>) -> MappingNode {
        MappingNode::Object {
            entries,
            range: None,
        }
    }

    #[must_use]
    pub fn array(items: Vec<MappingNode>) -> MappingNode {
        MappingNode::Array { items, range: None }
    }

    #[must_use]
    pub fn interpolation(value: StringWithSubstitutions) -> MappingNode {
        MappingNode::Interpolation { value, range: None }
    }

    #[must_use]
    pub fn with_range(mut self, new_range: SourceRange) -> MappingNode {
        match &mut self {
            MappingNode::Null { range }
            | MappingNode::Scalar { range, .. }
            | MappingNode::Object { range, .. }
            | MappingNode::Array { range, .. }
            | MappingNode::Interpolation { range, .. } => *range = Some(new_range),
        }
        self
    }

    /// A node is empty when no variant carries data.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, MappingNode::Null { .. })
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, MappingNode::Scalar { .. })
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            MappingNode::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_interpolation(&self) -> Option<&StringWithSubstitutions> {
        match self {
            MappingNode::Interpolation { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Name of the node's shape for error messages.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            MappingNode::Null { .. } => "null",
            MappingNode::Scalar { value, .. } => match value.kind() {
                crate::scalar::ScalarKind::String => "string",
                crate::scalar::ScalarKind::Integer => "integer",
                crate::scalar::ScalarKind::Float => "float",
                crate::scalar::ScalarKind::Boolean => "boolean",
            },
            MappingNode::Object { .. } => "object",
            MappingNode::Array { .. } => "array",
            MappingNode::Interpolation { .. } => "string with substitutions",
        }
    }

    #[must_use]
    pub const fn range(&self) -> Option<SourceRange> {
        match self {
            MappingNode::Null { range }
            | MappingNode::Scalar { range, .. }
            | MappingNode::Object { range, .. }
            | MappingNode::Array { range, .. }
            | MappingNode::Interpolation { range, .. } => *range,
        }
    }

    /// The best position for this node: its own when recorded, otherwise the
    /// parent's location downgraded to approximate.
    #[must_use]
    pub fn position_or(&self, parent: SourceRange) -> SourceRange {
        self.range().unwrap_or_else(|| parent.as_approximate())
    }

    /// Field lookup on an object node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MappingNode> {
        self.entry(key).map(|entry| &entry.value)
    }

    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&MappingEntry> {
        match self {
            MappingNode::Object { entries, .. } => {
                entries.iter().find(|entry| entry.key == key)
            }
            _ => None,
        }
    }

    /// Build a tree from a JSON value. Strings become plain scalars, never
    /// interpolations; the upstream parser is responsible for splitting
    /// `${...}` expressions out of source strings.
    #[must_use]
    pub fn from_json(value: &Value) -> MappingNode {
        match value {
            Value::Null => MappingNode::null(),
            Value::Array(items) => {
                MappingNode::array(items.iter().map(MappingNode::from_json).collect())
            }
            Value::Object(fields) => MappingNode::object(
                fields
                    .iter()
                    .map(|(key, value)| MappingEntry::new(key, MappingNode::from_json(value)))
                    .collect(),
            ),
            other => match ScalarValue::from_json(other) {
                Some(scalar) => MappingNode::scalar(scalar),
                // Numbers outside the f64 range; treat as empty.
                None => MappingNode::null(),
            },
        }
    }
}
