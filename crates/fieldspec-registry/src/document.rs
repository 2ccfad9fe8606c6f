//! # Schema Documents
//!
//! The dynamic origin of field definitions: a serde-loadable description of
//! one registry (or a bundle of them), typically read from YAML or JSON.
//!
//! ```yaml
//! id: Person
//! strict: true
//! validators: [strip_whitespace]
//! fields:
//!   - name: name
//!     type: { type: string, min_length: 2 }
//!   - name: age
//!     type: { type: int, gt: 0 }
//!     required: false
//! ```
//!
//! A document converts into exactly the `(Vec<FieldDef>, BuildOptions)` pair
//! a Rust caller would build by hand, and is built through the same
//! [`FieldRegistry::build`].

use fieldspec_core::{SchemaId, TypeExpr};
use serde::Deserialize;
use serde_json::Value;

use crate::builder::{BuildOptions, DerivedDef, DerivedErrorMode, FieldRegistry};
use crate::catalog::Catalog;
use crate::error::BuildError;
use crate::field::{FieldDef, FieldOptions};
use crate::hooks::{HookRef, HookTable};

fn default_true() -> bool {
    true
}

/// One field entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub examples: Vec<Value>,
}

/// One derived field entry; `hook` names an entry of the [`HookTable`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    pub hook: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A serialized registry definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    pub id: SchemaId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub materialize: bool,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub derived: Vec<DerivedDocument>,
    #[serde(default)]
    pub derived_errors: DerivedErrorMode,
}

impl SchemaDocument {
    /// The definition list and options this document describes.
    pub fn into_definition(self, hooks: &HookTable) -> (Vec<FieldDef>, BuildOptions) {
        let defs = self
            .fields
            .into_iter()
            .map(|f| FieldDef {
                name: f.name,
                type_expr: f.type_expr,
                options: FieldOptions {
                    required: f.required,
                    default: f.default,
                    title: f.title,
                    description: f.description,
                    examples: f.examples,
                },
            })
            .collect();

        let options = BuildOptions {
            id: self.id,
            title: self.title,
            description: self.description,
            strict: self.strict,
            materialize: self.materialize,
            validators: self.validators.into_iter().map(HookRef::Named).collect(),
            derived: self
                .derived
                .into_iter()
                .map(|d| DerivedDef {
                    name: d.name,
                    type_expr: d.type_expr,
                    hook: HookRef::Named(d.hook),
                    description: d.description,
                })
                .collect(),
            hooks: hooks.clone(),
            derived_errors: self.derived_errors,
        };
        (defs, options)
    }

    /// Build the registry this document describes.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] the builder raises.
    pub fn build(self, hooks: &HookTable) -> Result<FieldRegistry, BuildError> {
        let (defs, options) = self.into_definition(hooks);
        FieldRegistry::build(defs, options)
    }
}

/// Either a single schema document or a `schemas:` bundle.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaFile {
    Bundle { schemas: Vec<SchemaDocument> },
    Single(SchemaDocument),
}

impl SchemaFile {
    /// Id of the first document, the default root for validation.
    pub fn first_id(&self) -> Option<&SchemaId> {
        match self {
            Self::Bundle { schemas } => schemas.first().map(|d| &d.id),
            Self::Single(doc) => Some(&doc.id),
        }
    }

    /// Build every document and register them as one batch.
    ///
    /// # Errors
    ///
    /// The first [`BuildError`] from building or registering.
    pub fn into_catalog(self, hooks: &HookTable) -> Result<Catalog, BuildError> {
        let docs = match self {
            Self::Bundle { schemas } => schemas,
            Self::Single(doc) => vec![doc],
        };
        let registries = docs
            .into_iter()
            .map(|d| d.build(hooks))
            .collect::<Result<Vec<_>, _>>()?;
        let mut catalog = Catalog::new();
        catalog.register_all(registries)?;
        Ok(catalog)
    }
}
