//! # Reference Resolver
//!
//! Post-processing over generated documents:
//!
//! - [`resolve`] substitutes every local `$ref` with its target, up to
//!   `max_depth` nested substitutions. Past the bound the `$ref` is left in
//!   place, so recursive schemas terminate without an error.
//! - [`flatten`] inlines every reference whose target is not part of a
//!   reference cycle, keeps cyclic ones, and collapses single-member
//!   `anyOf` / `allOf`.
//!
//! Only local pointers (`#/definitions/<name>`, `#/$defs/<name>`) are
//! followed. Keywords written next to a `$ref` override the target's.
//! Both functions are pure: the input document is not modified.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::context::local_pointer;

/// Keys that hold definition sections.
const DEFINITION_KEYS: [&str; 2] = ["definitions", "$defs"];

/// Resolver options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveOptions {
    /// Maximum number of nested substitutions along one path.
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_depth: 8 }
    }
}

/// Inline local references up to `options.max_depth` levels deep.
///
/// The definitions section is dropped when no `$ref` remains; otherwise it is
/// pruned to the definitions the remaining references still need.
pub fn resolve(doc: &Value, options: &ResolveOptions) -> Value {
    let defs = collect_definitions(doc);
    let mut out = strip_definitions(doc);
    let mut unresolved = 0;
    inline(&mut out, &defs, options.max_depth, &mut |_: &str| true, &mut unresolved);
    if unresolved > 0 {
        tracing::warn!(
            unresolved,
            max_depth = options.max_depth,
            "depth bound reached; leaving $ref in place"
        );
    }
    let out = restore_definitions(doc, out, &defs);
    tracing::debug!(remaining_refs = count_refs(&out), "resolved schema references");
    out
}

/// Inline every reference that is not part of a cycle.
///
/// Cyclic references stay as `$ref`; their definitions are kept (with their
/// own acyclic references inlined) and everything else is pruned.
pub fn flatten(doc: &Value, options: &ResolveOptions) -> Value {
    let cyclic = cyclic_definitions(&collect_definitions(doc));
    let mut defs = collect_definitions(doc);
    let mut is_acyclic = |pointer: &str| !cyclic.contains(pointer);

    // Inline acyclic references inside the definitions that will survive.
    let mut unresolved = 0;
    for pointer in &cyclic {
        if let Some(mut schema) = defs.get(pointer).cloned() {
            inline(&mut schema, &defs, options.max_depth, &mut is_acyclic, &mut unresolved);
            collapse_single_member(&mut schema);
            defs.insert(pointer.clone(), schema);
        }
    }

    let mut out = strip_definitions(doc);
    inline(&mut out, &defs, options.max_depth, &mut is_acyclic, &mut unresolved);
    collapse_single_member(&mut out);
    tracing::debug!(cyclic = cyclic.len(), "flattened schema");
    restore_definitions(doc, out, &defs)
}

/// Local definitions keyed by their full pointer.
fn collect_definitions(doc: &Value) -> BTreeMap<String, Value> {
    let mut defs = BTreeMap::new();
    for key in DEFINITION_KEYS {
        if let Some(section) = doc.get(key).and_then(Value::as_object) {
            for (name, schema) in section {
                defs.insert(local_pointer(key, name), schema.clone());
            }
        }
    }
    defs
}

fn strip_definitions(doc: &Value) -> Value {
    let mut out = doc.clone();
    if let Value::Object(map) = &mut out {
        for key in DEFINITION_KEYS {
            map.remove(key);
        }
    }
    out
}

/// Put back the definitions that remaining references need, under their
/// original section keys.
fn restore_definitions(original: &Value, mut out: Value, defs: &BTreeMap<String, Value>) -> Value {
    let needed = reachable_pointers(&out, defs);
    if let Value::Object(map) = &mut out {
        for key in DEFINITION_KEYS {
            // Keep the original ordering of the section.
            let Some(original_section) = original.get(key).and_then(Value::as_object) else {
                continue;
            };
            let section: Map<String, Value> = original_section
                .keys()
                .filter_map(|name| {
                    let pointer = local_pointer(key, name);
                    if !needed.contains(&pointer) {
                        return None;
                    }
                    defs.get(&pointer).map(|schema| (name.clone(), schema.clone()))
                })
                .collect();
            if !section.is_empty() {
                map.insert(key.to_string(), Value::Object(section));
            }
        }
    }
    out
}

/// Replace `$ref` nodes in place.
///
/// `follow` decides per target pointer whether a reference may be inlined;
/// `depth` is the remaining substitution budget along this path.
fn inline(
    node: &mut Value,
    defs: &BTreeMap<String, Value>,
    depth: usize,
    follow: &mut dyn FnMut(&str) -> bool,
    unresolved: &mut usize,
) {
    match node {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .filter(|p| defs.contains_key(*p))
                .map(str::to_string);
            if let Some(pointer) = target {
                if !follow(&pointer) {
                    return;
                }
                if depth == 0 {
                    *unresolved += 1;
                    return;
                }
                let mut replacement = defs.get(&pointer).cloned().unwrap_or(Value::Null);
                if let Value::Object(target_map) = &mut replacement {
                    for (k, v) in map.iter() {
                        if k != "$ref" {
                            target_map.insert(k.clone(), v.clone());
                        }
                    }
                }
                inline(&mut replacement, defs, depth - 1, follow, unresolved);
                *node = replacement;
                return;
            }
            for (key, child) in map.iter_mut() {
                match child {
                    Value::Object(named) if is_name_map(key) => {
                        for schema in named.values_mut() {
                            inline(schema, defs, depth, follow, unresolved);
                        }
                    }
                    _ if is_data_keyword(key) => {}
                    _ => inline(child, defs, depth, follow, unresolved),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                inline(item, defs, depth, follow, unresolved);
            }
        }
        _ => {}
    }
}

/// Keywords whose values are instance data, not schemas.
fn is_data_keyword(key: &str) -> bool {
    matches!(key, "enum" | "const" | "default" | "examples") || key.starts_with("x-")
}

/// Keywords whose values map arbitrary names (possibly `default` or `enum`)
/// to schemas.
fn is_name_map(key: &str) -> bool {
    matches!(key, "properties" | "patternProperties" | "definitions" | "$defs")
}

/// Every pointer referenced from `node`, followed transitively through `defs`.
fn reachable_pointers(node: &Value, defs: &BTreeMap<String, Value>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut stack = Vec::new();
    collect_refs(node, &mut stack);
    while let Some(pointer) = stack.pop() {
        if !defs.contains_key(&pointer) || !found.insert(pointer.clone()) {
            continue;
        }
        if let Some(schema) = defs.get(&pointer) {
            collect_refs(schema, &mut stack);
        }
    }
    found
}

fn collect_refs(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if let Some(pointer) = map.get("$ref").and_then(Value::as_str) {
                out.push(pointer.to_string());
            }
            for (key, child) in map {
                match child {
                    Value::Object(named) if is_name_map(key) => {
                        named.values().for_each(|schema| collect_refs(schema, out));
                    }
                    _ if is_data_keyword(key) => {}
                    _ => collect_refs(child, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|i| collect_refs(i, out)),
        _ => {}
    }
}

/// Number of `$ref` nodes outside definition sections.
pub fn count_refs(doc: &Value) -> usize {
    let mut refs = Vec::new();
    collect_refs(&strip_definitions(doc), &mut refs);
    refs.len()
}

/// Pointers of definitions that can reach themselves through references.
fn cyclic_definitions(defs: &BTreeMap<String, Value>) -> BTreeSet<String> {
    let edges: BTreeMap<&str, Vec<String>> = defs
        .iter()
        .map(|(pointer, schema)| {
            let mut refs = Vec::new();
            collect_refs(schema, &mut refs);
            (pointer.as_str(), refs)
        })
        .collect();

    let mut cyclic = BTreeSet::new();
    for start in defs.keys() {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = edges.get(start.as_str()).map_or_else(Vec::new, |v| {
            v.iter().map(String::as_str).collect()
        });
        while let Some(next) = stack.pop() {
            if next == start {
                cyclic.insert(start.clone());
                break;
            }
            if seen.insert(next) {
                if let Some(more) = edges.get(next) {
                    stack.extend(more.iter().map(String::as_str));
                }
            }
        }
    }
    cyclic
}

/// Replace `{"anyOf": [X]}` / `{"allOf": [X]}` with `X`, keeping sibling
/// keywords, everywhere in the tree.
fn collapse_single_member(node: &mut Value) {
    match node {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match child {
                    Value::Object(named) if is_name_map(key) => {
                        named.values_mut().for_each(collapse_single_member);
                    }
                    _ if is_data_keyword(key) => {}
                    _ => collapse_single_member(child),
                }
            }
            for keyword in ["anyOf", "allOf"] {
                let single = match map.get(keyword) {
                    Some(Value::Array(members)) if members.len() == 1 => members[0].clone(),
                    _ => continue,
                };
                let Value::Object(mut merged) = single else {
                    continue;
                };
                map.remove(keyword);
                for (k, v) in std::mem::take(map) {
                    merged.insert(k, v);
                }
                *map = merged;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(collapse_single_member),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Node -> children: list[ref[Node]], generated shape.
    fn linked_list() -> Value {
        json!({
            "type": "object",
            "properties": {
                "value": {"type": "integer"},
                "next": {"$ref": "#/definitions/Node"}
            },
            "required": ["value"],
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "next": {"$ref": "#/definitions/Node"}
                    },
                    "required": ["value"]
                }
            }
        })
    }

    #[test]
    fn depth_bound_leaves_one_ref_for_a_self_reference() {
        let out = resolve(&linked_list(), &ResolveOptions { max_depth: 2 });
        assert_eq!(count_refs(&out), 1);
        assert_eq!(
            out["properties"]["next"]["properties"]["next"]["properties"]["next"]["$ref"],
            "#/definitions/Node"
        );
        assert!(out["definitions"]["Node"].is_object());
    }

    #[test]
    fn acyclic_refs_resolve_completely_and_drop_definitions() {
        let doc = json!({
            "type": "object",
            "properties": {
                "home": {"$ref": "#/$defs/Address", "description": "Where they live"}
            },
            "$defs": {
                "Address": {"type": "object", "description": "An address", "properties": {"city": {"type": "string"}}}
            }
        });
        let out = resolve(&doc, &ResolveOptions::default());
        assert_eq!(count_refs(&out), 0);
        assert!(out.get("$defs").is_none());
        assert_eq!(out["properties"]["home"]["description"], "Where they live");
        assert_eq!(out["properties"]["home"]["properties"]["city"]["type"], "string");
    }

    #[test]
    fn remote_refs_are_untouched() {
        let doc = json!({"properties": {"x": {"$ref": "https://example.com/schema.json"}}});
        assert_eq!(resolve(&doc, &ResolveOptions::default()), doc);
    }

    #[test]
    fn data_keywords_are_not_walked() {
        let doc = json!({
            "properties": {"x": {"enum": [{"$ref": "#/definitions/A"}]}},
            "definitions": {"A": {"type": "string"}}
        });
        let out = resolve(&doc, &ResolveOptions::default());
        assert_eq!(out["properties"]["x"]["enum"][0]["$ref"], "#/definitions/A");
    }

    #[test]
    fn properties_named_like_keywords_are_schemas() {
        let doc = json!({
            "properties": {"default": {"$ref": "#/definitions/A"}},
            "definitions": {"A": {"type": "string"}}
        });
        let out = resolve(&doc, &ResolveOptions::default());
        assert_eq!(out["properties"]["default"]["type"], "string");
        assert!(out.get("definitions").is_none());
    }

    #[test]
    fn escaped_pointers_match_their_definitions() {
        let doc = json!({
            "properties": {"tag": {"$ref": "#/definitions/v1~1Tag"}},
            "definitions": {"v1/Tag": {"type": "string"}}
        });
        let out = resolve(&doc, &ResolveOptions::default());
        assert_eq!(out["properties"]["tag"], json!({"type": "string"}));
    }

    #[test]
    fn flatten_keeps_only_cyclic_refs() {
        let doc = json!({
            "type": "object",
            "properties": {
                "tree": {"$ref": "#/definitions/Tree"},
                "owner": {"anyOf": [{"$ref": "#/definitions/Person"}]}
            },
            "definitions": {
                "Tree": {
                    "type": "object",
                    "properties": {
                        "kids": {"type": "array", "items": {"$ref": "#/definitions/Tree"}},
                        "tag": {"$ref": "#/definitions/Tag"}
                    }
                },
                "Person": {"type": "object", "properties": {"name": {"type": "string"}}},
                "Tag": {"type": "string", "maxLength": 8}
            }
        });
        let out = flatten(&doc, &ResolveOptions::default());
        assert_eq!(out["properties"]["tree"]["$ref"], "#/definitions/Tree");
        assert_eq!(out["properties"]["owner"]["properties"]["name"]["type"], "string");
        assert!(out["properties"]["owner"].get("anyOf").is_none());

        let defs = out["definitions"].as_object().unwrap();
        assert_eq!(defs.keys().collect::<Vec<_>>(), vec!["Tree"]);
        assert_eq!(defs["Tree"]["properties"]["tag"]["maxLength"], 8);
        assert_eq!(defs["Tree"]["properties"]["kids"]["items"]["$ref"], "#/definitions/Tree");
    }

    #[test]
    fn mutual_recursion_is_cyclic() {
        let defs: BTreeMap<String, Value> = [
            ("#/definitions/A".to_string(), json!({"properties": {"b": {"$ref": "#/definitions/B"}}})),
            ("#/definitions/B".to_string(), json!({"properties": {"a": {"$ref": "#/definitions/A"}}})),
            ("#/definitions/C".to_string(), json!({"properties": {"a": {"$ref": "#/definitions/A"}}})),
        ]
        .into_iter()
        .collect();
        let cyclic = cyclic_definitions(&defs);
        assert_eq!(cyclic.into_iter().collect::<Vec<_>>(), vec!["#/definitions/A", "#/definitions/B"]);
    }

    #[test]
    fn resolve_is_pure() {
        let doc = linked_list();
        let before = doc.clone();
        let _ = resolve(&doc, &ResolveOptions { max_depth: 3 });
        let _ = flatten(&doc, &ResolveOptions::default());
        assert_eq!(doc, before);
    }
}
