//! # Canonical Types
//!
//! [`CanonicalType`] is the single internal representation every field type
//! is normalized into. It is a closed tagged union: the normalizer, the
//! constraint engine, the validation pipeline and the JSON Schema generator
//! all `match` on it exhaustively, so adding a variant forces every consumer
//! to handle it.
//!
//! Canonical types are immutable once built. Constraints attached to a type
//! are guaranteed (by [`crate::normalize`]) to be valid for its kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constraint::Constraint;

/// Identity of a field registry, used as the target of [`CanonicalType::SchemaRef`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(String);

impl SchemaId {
    /// Wrap a registry name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SchemaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    /// Accepts any JSON value.
    Any,
}

impl PrimitiveKind {
    /// Canonical identifier (also the JSON Schema `type` name, except `Any`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Any => "any",
        }
    }

    /// Resolve a bare identifier, accepting the common short aliases.
    pub fn from_identifier(ident: &str) -> Option<Self> {
        match ident {
            "string" | "str" => Some(Self::String),
            "integer" | "int" => Some(Self::Integer),
            "number" | "float" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "null" | "none" => Some(Self::Null),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    /// Whether a JSON value has this kind's shape.
    ///
    /// `Integer` accepts any number with a zero fractional part; nothing is
    /// ever coerced between kinds.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => match value {
                Value::Number(n) => {
                    n.is_i64()
                        || n.is_u64()
                        || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
                }
                _ => false,
            },
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
            Self::Any => true,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized field type plus its constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalType {
    /// A scalar.
    Primitive {
        kind: PrimitiveKind,
        constraints: Vec<Constraint>,
    },
    /// A homogeneous list.
    Array {
        element: Box<CanonicalType>,
        constraints: Vec<Constraint>,
    },
    /// A string-keyed dictionary with homogeneous values.
    Map {
        key: Box<CanonicalType>,
        value: Box<CanonicalType>,
        constraints: Vec<Constraint>,
    },
    /// Any one of several types.
    Union {
        variants: Vec<CanonicalType>,
        constraints: Vec<Constraint>,
    },
    /// A nested record described by another registry.
    SchemaRef(SchemaId),
}

impl CanonicalType {
    /// An unconstrained primitive.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive {
            kind,
            constraints: Vec::new(),
        }
    }

    /// An unconstrained array.
    pub fn array(element: CanonicalType) -> Self {
        Self::Array {
            element: Box::new(element),
            constraints: Vec::new(),
        }
    }

    /// An unconstrained string-keyed map.
    pub fn map(value: CanonicalType) -> Self {
        Self::Map {
            key: Box::new(Self::primitive(PrimitiveKind::String)),
            value: Box::new(value),
            constraints: Vec::new(),
        }
    }

    /// An unconstrained union.
    pub fn union(variants: Vec<CanonicalType>) -> Self {
        Self::Union {
            variants,
            constraints: Vec::new(),
        }
    }

    /// A reference to another registry.
    pub fn reference(target: impl Into<SchemaId>) -> Self {
        Self::SchemaRef(target.into())
    }

    /// Constraints attached directly to this node.
    pub fn constraints(&self) -> &[Constraint] {
        match self {
            Self::Primitive { constraints, .. }
            | Self::Array { constraints, .. }
            | Self::Map { constraints, .. }
            | Self::Union { constraints, .. } => constraints,
            Self::SchemaRef(_) => &[],
        }
    }

    /// Short name of this node's kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive { kind, .. } => kind.as_str(),
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Union { .. } => "union",
            Self::SchemaRef(_) => "reference",
        }
    }

    /// Whether `null` is an acceptable value.
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Primitive { kind, .. } => {
                matches!(kind, PrimitiveKind::Null | PrimitiveKind::Any)
            }
            Self::Union { variants, .. } => variants.iter().any(Self::is_nullable),
            Self::Array { .. } | Self::Map { .. } | Self::SchemaRef(_) => false,
        }
    }

    /// Every registry this type references, in first-seen order.
    pub fn references(&self) -> Vec<&SchemaId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a SchemaId>) {
        match self {
            Self::Primitive { .. } => {}
            Self::Array { element, .. } => element.collect_references(out),
            Self::Map { key, value, .. } => {
                key.collect_references(out);
                value.collect_references(out);
            }
            Self::Union { variants, .. } => {
                for v in variants {
                    v.collect_references(out);
                }
            }
            Self::SchemaRef(id) => {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
    }
}

/// Renders the shorthand form (`list[int]`, `map[string, int]`, `a | b`).
/// Constraints are not rendered.
impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive { kind, .. } => write!(f, "{kind}"),
            Self::Array { element, .. } => write!(f, "list[{element}]"),
            Self::Map { key, value, .. } => write!(f, "map[{key}, {value}]"),
            Self::Union { variants, .. } => {
                for (i, v) in variants.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    match v {
                        Self::Union { .. } => write!(f, "({v})")?,
                        _ => write!(f, "{v}")?,
                    }
                }
                Ok(())
            }
            Self::SchemaRef(id) => write!(f, "ref[{id}]"),
        }
    }
}
