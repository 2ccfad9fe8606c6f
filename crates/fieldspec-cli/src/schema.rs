//! # Schema Subcommand
//!
//! Emits the JSON Schema of a registry from a schema file. Post-processing
//! runs in a fixed order: generate, then resolve or flatten, then the target
//! profile.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use serde_json::Value;

use fieldspec_jsonschema::{
    enforce_target_profile, flatten, generate_in, profile_by_name, profiles, resolve,
    GenerateOptions, ResolveOptions,
};

/// Arguments for the `fieldspec schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema file (YAML or JSON) holding one schema or a `schemas:` bundle.
    #[arg(long, short, value_name = "SCHEMA", required_unless_present = "list_profiles")]
    pub schema: Option<PathBuf>,

    /// Id of the schema to emit. Defaults to the first one.
    #[arg(long)]
    pub root: Option<String>,

    /// Inline local references up to --max-depth levels.
    #[arg(long, conflicts_with = "flatten")]
    pub resolve: bool,

    /// Inline every non-recursive reference.
    #[arg(long)]
    pub flatten: bool,

    /// Depth bound for --resolve and --flatten.
    #[arg(long, default_value_t = ResolveOptions::default().max_depth)]
    pub max_depth: usize,

    /// Rewrite the document for a named target profile.
    #[arg(long)]
    pub profile: Option<String>,

    /// Key under which referenced schemas are emitted.
    #[arg(long, default_value = "definitions")]
    pub definitions_key: String,

    /// Omit field examples.
    #[arg(long)]
    pub no_examples: bool,

    /// List the available target profiles and exit.
    #[arg(long)]
    pub list_profiles: bool,
}

/// Execute the schema subcommand.
pub fn run_schema(args: &SchemaArgs) -> Result<u8> {
    if args.list_profiles {
        for profile in profiles() {
            println!("{:<16} {}", profile.name, profile.description);
        }
        return Ok(0);
    }
    let document = build_document(args)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(0)
}

/// Generate and post-process the document described by `args`.
pub fn build_document(args: &SchemaArgs) -> Result<Value> {
    let Some(path) = &args.schema else {
        bail!("--schema is required");
    };
    // Fail on an unknown profile before doing any work.
    let profile = args.profile.as_deref().map(profile_by_name).transpose()?;

    let loaded = crate::load_schemas(path, args.root.as_deref())?;
    let options = GenerateOptions {
        definitions_key: args.definitions_key.clone(),
        include_examples: !args.no_examples,
        ..GenerateOptions::default()
    };
    let mut document = generate_in(loaded.root()?, &loaded.catalog, &options)?;

    let resolve_options = ResolveOptions { max_depth: args.max_depth };
    if args.resolve {
        document = resolve(&document, &resolve_options);
    } else if args.flatten {
        document = flatten(&document, &resolve_options);
    }
    if let Some(profile) = profile {
        document = enforce_target_profile(document, profile);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{write_file, BUNDLE};

    const TREE: &str = r#"
id: Node
fields:
  - name: value
    type: int
  - name: next
    type: "optional[ref[Node]]"
    required: false
"#;

    fn args(schema: PathBuf) -> SchemaArgs {
        SchemaArgs {
            schema: Some(schema),
            root: None,
            resolve: false,
            flatten: false,
            max_depth: 8,
            profile: None,
            definitions_key: "definitions".into(),
            no_examples: false,
            list_profiles: false,
        }
    }

    #[test]
    fn plain_generation_keeps_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let doc = build_document(&args(write_file(dir.path(), "s.yaml", BUNDLE))).unwrap();
        assert_eq!(doc["properties"]["address"]["$ref"], "#/definitions/Address");
        assert!(doc["definitions"]["Address"].is_object());
        assert_eq!(doc["additionalProperties"], false);
    }

    #[test]
    fn resolve_inlines_acyclic_refs() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(write_file(dir.path(), "s.yaml", BUNDLE));
        a.resolve = true;
        let doc = build_document(&a).unwrap();
        assert_eq!(doc["properties"]["address"]["properties"]["city"]["type"], "string");
        assert!(doc.get("definitions").is_none());
    }

    #[test]
    fn resolve_respects_depth_bound() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(write_file(dir.path(), "tree.yaml", TREE));
        a.resolve = true;
        a.max_depth = 2;
        let doc = build_document(&a).unwrap();
        assert!(fieldspec_jsonschema::count_refs(&doc) <= 1);
    }

    #[test]
    fn profile_is_applied_last() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(write_file(dir.path(), "s.yaml", BUNDLE));
        a.flatten = true;
        a.profile = Some("strict-output".into());
        let doc = build_document(&a).unwrap();
        assert_eq!(doc["required"], serde_json::json!(["name", "age", "address"]));
        assert_eq!(doc["properties"]["age"]["anyOf"][1]["type"], "null");
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(write_file(dir.path(), "s.yaml", BUNDLE));
        a.profile = Some("nope".into());
        let err = build_document(&a).unwrap_err();
        assert!(err.to_string().contains("strict-output"), "{err}");
    }
}
