//! # Target Profiles
//!
//! A target profile rewrites a generated document to fit the dialect of a
//! particular consumer. Profiles are plain functions over the document and
//! are looked up by name; [`profiles`] lists every registered one.
//!
//! | Profile          | Effect                                                     |
//! |------------------|------------------------------------------------------------|
//! | `closed-objects` | every object schema gets `additionalProperties: false`     |
//! | `strict-output`  | closed objects, all properties required, optional ones     |
//! |                  | widened to `anyOf [T, null]`, unsupported formats and      |
//! |                  | annotation keywords removed                                |
//! | `minimal`        | annotation keywords removed                                |
//!
//! The walker only descends into keywords that hold schemas, so instance
//! data under `enum`, `const`, `default` or `examples` is never rewritten.

use serde_json::{json, Map, Value};

use crate::error::UnknownProfile;

/// A named document transform.
#[derive(Debug, Clone, Copy)]
pub struct TargetProfile {
    pub name: &'static str,
    pub description: &'static str,
    transform: fn(Value) -> Value,
}

impl TargetProfile {
    pub fn apply(&self, doc: Value) -> Value {
        (self.transform)(doc)
    }
}

pub const CLOSED_OBJECTS: TargetProfile = TargetProfile {
    name: "closed-objects",
    description: "Disallow undeclared properties on every object schema",
    transform: closed_objects,
};

pub const STRICT_OUTPUT: TargetProfile = TargetProfile {
    name: "strict-output",
    description: "Structured-output dialect: closed objects, every property required, nullable optionals",
    transform: strict_output,
};

pub const MINIMAL: TargetProfile = TargetProfile {
    name: "minimal",
    description: "Drop titles, descriptions, examples, defaults and extensions",
    transform: minimal,
};

static PROFILES: [TargetProfile; 3] = [CLOSED_OBJECTS, STRICT_OUTPUT, MINIMAL];

/// Formats the strict-output dialect accepts.
const STRICT_FORMATS: [&str; 7] = ["date-time", "date", "time", "email", "uuid", "ipv4", "ipv6"];

/// Every registered profile.
pub fn profiles() -> &'static [TargetProfile] {
    &PROFILES
}

pub fn profile_by_name(name: &str) -> Result<&'static TargetProfile, UnknownProfile> {
    PROFILES.iter().find(|p| p.name == name).ok_or_else(|| UnknownProfile {
        name: name.to_string(),
        available: PROFILES.iter().map(|p| p.name).collect::<Vec<_>>().join(", "),
    })
}

/// Rewrite `doc` for the given profile.
pub fn enforce_target_profile(doc: Value, profile: &TargetProfile) -> Value {
    tracing::debug!(profile = profile.name, "applying target profile");
    profile.apply(doc)
}

// ---------------------------------------------------------------------------
// Schema walker
// ---------------------------------------------------------------------------

/// Keywords whose value is a map of name to schema.
/// `dependencies` may also map to property lists, which the walker skips.
const SCHEMA_MAPS: [&str; 6] = [
    "properties",
    "definitions",
    "$defs",
    "patternProperties",
    "dependencies",
    "dependentSchemas",
];
/// Keywords whose value is a single schema.
const SCHEMA_SINGLE: [&str; 9] = [
    "items",
    "additionalItems",
    "additionalProperties",
    "propertyNames",
    "contains",
    "not",
    "if",
    "then",
    "else",
];
/// Keywords whose value is a list of schemas. Draft 7 tuple `items` is a list.
const SCHEMA_LISTS: [&str; 5] = ["anyOf", "allOf", "oneOf", "prefixItems", "items"];

/// Apply `visit` to every schema node, children first.
fn walk(node: &mut Value, visit: &mut dyn FnMut(&mut Map<String, Value>)) {
    let Value::Object(map) = node else {
        return;
    };
    for key in SCHEMA_MAPS {
        if let Some(Value::Object(children)) = map.get_mut(key) {
            for child in children.values_mut() {
                walk(child, visit);
            }
        }
    }
    for key in SCHEMA_SINGLE {
        if let Some(child) = map.get_mut(key) {
            walk(child, visit);
        }
    }
    for key in SCHEMA_LISTS {
        if let Some(Value::Array(children)) = map.get_mut(key) {
            for child in children {
                walk(child, visit);
            }
        }
    }
    visit(map);
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some("object") || map.contains_key("properties")
}

fn strip_annotations(map: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        map.remove(*key);
    }
    map.retain(|key, _| !key.starts_with("x-"));
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

fn closed_objects(mut doc: Value) -> Value {
    walk(&mut doc, &mut |map: &mut Map<String, Value>| {
        // A map-typed schema already constrains its values.
        if is_object_schema(map) && !map.contains_key("additionalProperties") {
            map.insert("additionalProperties".into(), Value::Bool(false));
        }
    });
    doc
}

fn strict_output(mut doc: Value) -> Value {
    walk(&mut doc, &mut |map: &mut Map<String, Value>| {
        strip_annotations(map, &["default", "examples"]);

        if let Some(format) = map.get("format").and_then(Value::as_str) {
            if !STRICT_FORMATS.contains(&format) {
                map.remove("format");
            }
        }

        if !is_object_schema(map) {
            return;
        }
        if !matches!(map.get("additionalProperties"), Some(Value::Object(_))) {
            map.insert("additionalProperties".into(), Value::Bool(false));
        }
        let required: Vec<String> = map
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let Some(Value::Object(properties)) = map.get_mut("properties") else {
            return;
        };
        for (name, schema) in properties.iter_mut() {
            if !required.contains(name) {
                *schema = nullable(std::mem::take(schema));
            }
        }
        let all: Vec<Value> = properties.keys().cloned().map(Value::String).collect();
        map.insert("required".into(), Value::Array(all));
    });
    doc
}

/// Widen `schema` to also accept null, unless it already does.
fn nullable(schema: Value) -> Value {
    let accepts_null = match &schema {
        Value::Object(map) if map.is_empty() => true,
        Value::Object(map) => {
            map.get("type").and_then(Value::as_str) == Some("null")
                || map
                    .get("anyOf")
                    .and_then(Value::as_array)
                    .is_some_and(|variants| variants.iter().any(|v| v.get("type") == Some(&json!("null"))))
        }
        _ => true,
    };
    if accepts_null {
        schema
    } else {
        json!({ "anyOf": [schema, { "type": "null" }] })
    }
}

fn minimal(mut doc: Value) -> Value {
    walk(&mut doc, &mut |map: &mut Map<String, Value>| {
        strip_annotations(map, &["title", "description", "examples", "default", "readOnly"]);
    });
    doc
}
