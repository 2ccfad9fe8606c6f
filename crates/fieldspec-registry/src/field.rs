//! Field definitions (builder input) and field descriptors (registry content).

use fieldspec_core::{CanonicalType, TypeExpr};
use serde_json::Value;

use crate::hooks::HookIdentity;

/// Per-field options supplied by the schema author.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOptions {
    /// Whether the field must be present. Ignored when a default is given.
    pub required: bool,
    /// Substituted when the field is absent.
    pub default: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub examples: Vec<Value>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            required: true,
            default: None,
            title: None,
            description: None,
            examples: Vec::new(),
        }
    }
}

/// One entry of the ordered definition list given to
/// [`FieldRegistry::build`](crate::FieldRegistry::build).
///
/// Static (Rust builder) and dynamic ([`SchemaDocument`](crate::SchemaDocument))
/// definitions both produce this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub type_expr: TypeExpr,
    pub options: FieldOptions,
}

impl FieldDef {
    /// A required field with no metadata.
    pub fn new(name: impl Into<String>, type_expr: impl Into<TypeExpr>) -> Self {
        Self {
            name: name.into(),
            type_expr: type_expr.into(),
            options: FieldOptions::default(),
        }
    }

    /// Mark the field as not required.
    pub fn optional(mut self) -> Self {
        self.options.required = false;
        self
    }

    /// Declare a default value; the field is then never reported missing.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.options.default = Some(value.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.options.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.options.description = Some(description.into());
        self
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.options.examples.push(example.into());
        self
    }
}

/// A field as stored on a built registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Unique within its registry.
    pub name: String,
    pub ty: CanonicalType,
    /// Always false for derived fields and for fields with a default.
    pub required: bool,
    pub default: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub examples: Vec<Value>,
    /// True only for computed fields; never caller-settable.
    pub derived: bool,
    /// The producing hook, for derived fields.
    pub hook: Option<HookIdentity>,
}
