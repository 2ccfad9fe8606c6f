//! # JSON Schema Generator
//!
//! Walks a [`FieldRegistry`] and emits a JSON Schema object document:
//!
//! ```json
//! {
//!   "type": "object",
//!   "title": "...",
//!   "properties": { "name": { "type": "string", "minLength": 2 } },
//!   "required": ["name"],
//!   "definitions": { "Address": { "type": "object", ... } }
//! }
//! ```
//!
//! `ref[...]` types become `$ref` pointers. Each target is generated once,
//! after the primary walk, into the definitions section; a registry that
//! refers to itself is also emitted there. Derived fields are `readOnly`,
//! never `required`, and carry an extension key naming their hook.
//!
//! ## Keyword mapping
//!
//! | constraint | string | array | map | number |
//! |---|---|---|---|---|
//! | `min_length` | `minLength` | `minItems` | `minProperties` | |
//! | `max_length` | `maxLength` | `maxItems` | `maxProperties` | |
//! | `gt` / `gteq` | | | | `exclusiveMinimum` / `minimum` |
//! | `lt` / `lteq` | | | | `exclusiveMaximum` / `maximum` |
//! | `multiple_of` | | | | `multipleOf` |
//!
//! `pattern`, `format`, `choices` (`enum`) and `unique_items`
//! (`uniqueItems`) map one to one.

use fieldspec_core::{CanonicalType, Constraint, PrimitiveKind};
use fieldspec_registry::{Catalog, FieldDescriptor, FieldRegistry};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::context::RefContext;
use crate::error::GenerateError;

/// Generator options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateOptions {
    /// Key of the definitions section: `definitions` or `$defs`.
    pub definitions_key: String,
    pub include_examples: bool,
    pub include_defaults: bool,
    /// Extension key attached to derived fields.
    pub hook_extension_key: String,
    /// Emit `additionalProperties: false` for strict registries.
    pub closed_when_strict: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            definitions_key: "definitions".to_string(),
            include_examples: true,
            include_defaults: true,
            hook_extension_key: "x-derived-from".to_string(),
            closed_when_strict: true,
        }
    }
}

/// Generate the schema of `registry`. References may only target the
/// registry itself.
///
/// # Errors
///
/// [`GenerateError::UnresolvedReference`] for any other reference target.
pub fn generate(registry: &FieldRegistry, options: &GenerateOptions) -> Result<Value, GenerateError> {
    run(registry, None, options)
}

/// Generate the schema of `registry`, resolving references through `catalog`.
///
/// # Errors
///
/// [`GenerateError::UnresolvedReference`] for a target found in neither.
pub fn generate_in(
    registry: &FieldRegistry,
    catalog: &Catalog,
    options: &GenerateOptions,
) -> Result<Value, GenerateError> {
    run(registry, Some(catalog), options)
}

fn run(
    root: &FieldRegistry,
    catalog: Option<&Catalog>,
    options: &GenerateOptions,
) -> Result<Value, GenerateError> {
    let mut ctx = RefContext::new(&options.definitions_key);
    let mut document = object_schema(root, options, &mut ctx);

    while let Some(target) = ctx.next_pending() {
        let registry = catalog
            .and_then(|c| c.get(&target))
            .or_else(|| (root.id() == &target).then_some(root))
            .ok_or_else(|| GenerateError::UnresolvedReference(target.clone()))?;
        let schema = object_schema(registry, options, &mut ctx);
        ctx.define(&target, schema);
    }

    let (key, definitions) = ctx.finish();
    tracing::debug!(
        registry = %root.id(),
        properties = root.fields().len(),
        definitions = definitions.len(),
        "generated json schema"
    );
    if !definitions.is_empty() {
        if let Value::Object(doc) = &mut document {
            doc.insert(key, Value::Object(definitions));
        }
    }
    Ok(document)
}

fn object_schema(registry: &FieldRegistry, options: &GenerateOptions, ctx: &mut RefContext) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    if let Some(title) = registry.title() {
        schema.insert("title".into(), json!(title));
    }
    if let Some(description) = registry.description() {
        schema.insert("description".into(), json!(description));
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in registry.fields() {
        properties.insert(field.name.clone(), field_schema(field, options, ctx));
        if field.required && !field.derived {
            required.push(json!(field.name));
        }
    }
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), Value::Array(required));
    if registry.is_strict() && options.closed_when_strict {
        schema.insert("additionalProperties".into(), json!(false));
    }
    Value::Object(schema)
}

fn field_schema(field: &FieldDescriptor, options: &GenerateOptions, ctx: &mut RefContext) -> Value {
    let mut schema = match type_schema(&field.ty, ctx) {
        Value::Object(map) => map,
        other => return other,
    };
    if let Some(title) = &field.title {
        schema.insert("title".into(), json!(title));
    }
    if let Some(description) = &field.description {
        schema.insert("description".into(), json!(description));
    }
    if options.include_defaults {
        if let Some(default) = &field.default {
            schema.insert("default".into(), default.clone());
        }
    }
    if options.include_examples && !field.examples.is_empty() {
        schema.insert("examples".into(), Value::Array(field.examples.clone()));
    }
    if field.derived {
        schema.insert("readOnly".into(), json!(true));
        if let Some(hook) = &field.hook {
            schema.insert(
                options.hook_extension_key.clone(),
                json!({
                    "name": hook.name,
                    "module": hook.module,
                    "ordinal": hook.ordinal,
                    "identity": hook.qualified(),
                }),
            );
        }
    }
    Value::Object(schema)
}

/// Schema for one canonical type.
fn type_schema(ty: &CanonicalType, ctx: &mut RefContext) -> Value {
    let mut schema = Map::new();
    match ty {
        CanonicalType::Primitive { kind, constraints } => {
            if *kind != PrimitiveKind::Any {
                schema.insert("type".into(), json!(kind.as_str()));
            }
            apply_constraints(&mut schema, constraints, LengthKeywords::STRING);
        }
        CanonicalType::Array {
            element,
            constraints,
        } => {
            schema.insert("type".into(), json!("array"));
            schema.insert("items".into(), type_schema(element, ctx));
            apply_constraints(&mut schema, constraints, LengthKeywords::ARRAY);
        }
        CanonicalType::Map {
            key,
            value,
            constraints,
        } => {
            schema.insert("type".into(), json!("object"));
            schema.insert("additionalProperties".into(), type_schema(value, ctx));
            if !key.constraints().is_empty() || matches!(**key, CanonicalType::Union { .. }) {
                schema.insert("propertyNames".into(), type_schema(key, ctx));
            }
            apply_constraints(&mut schema, constraints, LengthKeywords::MAP);
        }
        CanonicalType::Union {
            variants,
            constraints,
        } => {
            let any_of: Vec<Value> = variants.iter().map(|v| type_schema(v, ctx)).collect();
            schema.insert("anyOf".into(), Value::Array(any_of));
            apply_constraints(&mut schema, constraints, LengthKeywords::STRING);
        }
        CanonicalType::SchemaRef(target) => return ctx.reference(target),
    }
    Value::Object(schema)
}

struct LengthKeywords {
    min: &'static str,
    max: &'static str,
}

impl LengthKeywords {
    const STRING: Self = Self {
        min: "minLength",
        max: "maxLength",
    };
    const ARRAY: Self = Self {
        min: "minItems",
        max: "maxItems",
    };
    const MAP: Self = Self {
        min: "minProperties",
        max: "maxProperties",
    };
}

fn apply_constraints(schema: &mut Map<String, Value>, constraints: &[Constraint], lengths: LengthKeywords) {
    for c in constraints {
        let (key, value) = match c {
            Constraint::MinLength(n) => (lengths.min, json!(n)),
            Constraint::MaxLength(n) => (lengths.max, json!(n)),
            Constraint::Gt(n) => ("exclusiveMinimum", Value::Number(n.clone())),
            Constraint::Gteq(n) => ("minimum", Value::Number(n.clone())),
            Constraint::Lt(n) => ("exclusiveMaximum", Value::Number(n.clone())),
            Constraint::Lteq(n) => ("maximum", Value::Number(n.clone())),
            Constraint::MultipleOf(n) => ("multipleOf", Value::Number(n.clone())),
            Constraint::Pattern(p) => ("pattern", json!(p.as_str())),
            Constraint::Format(f) => ("format", json!(f.as_str())),
            Constraint::Choices(choices) => ("enum", Value::Array(choices.clone())),
            Constraint::UniqueItems => ("uniqueItems", json!(true)),
        };
        schema.insert(key.to_string(), value);
    }
}
