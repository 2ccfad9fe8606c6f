//! # fieldspec-cli: Command-Line Interface
//!
//! Provides the `fieldspec` binary.
//!
//! ## Subcommands
//!
//! - `fieldspec validate`: validate an instance file against a schema file.
//! - `fieldspec schema`: emit the JSON Schema of a schema file, optionally
//!   resolved, flattened, or rewritten for a target profile.
//!
//! Schema files are YAML or JSON documents holding either a single schema or
//! a `schemas:` bundle. Hook names resolve against the standard hook table.
//!
//! ```bash
//! fieldspec validate --schema person.yaml --data jane.json
//! fieldspec schema --schema person.yaml --resolve --max-depth 2
//! fieldspec schema --schema person.yaml --profile strict-output
//! ```
//!
//! Argument parsing lives in `main.rs`; handlers here return an exit code.

pub mod schema;
pub mod validate;

use std::path::Path;

use anyhow::{bail, Context, Result};
use fieldspec_core::SchemaId;
use fieldspec_registry::{Catalog, FieldRegistry, HookTable, SchemaFile};
use serde_json::Value;

/// A loaded schema file: every registry it defines plus the root to use.
#[derive(Debug)]
pub struct LoadedSchemas {
    pub catalog: Catalog,
    pub root: SchemaId,
}

impl LoadedSchemas {
    pub fn root(&self) -> Result<&FieldRegistry> {
        self.catalog
            .get(&self.root)
            .with_context(|| format!("schema '{}' is not defined in the schema file", self.root))
    }
}

/// Read a YAML or JSON file into a JSON value, by extension.
pub fn read_document(path: &Path) -> Result<Value> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("invalid YAML in {}", path.display()))
    }
}

/// Load and build a schema file.
///
/// `root` selects the registry to work with; the first document in the file
/// is used when it is `None`.
pub fn load_schemas(path: &Path, root: Option<&str>) -> Result<LoadedSchemas> {
    let raw = read_document(path)?;
    let file: SchemaFile = serde_json::from_value(raw)
        .with_context(|| format!("{} is not a schema document", path.display()))?;
    let root = match root {
        Some(id) => SchemaId::from(id),
        None => file
            .first_id()
            .cloned()
            .with_context(|| format!("{} defines no schemas", path.display()))?,
    };
    let catalog = file
        .into_catalog(&HookTable::standard())
        .with_context(|| format!("failed to build schemas from {}", path.display()))?;

    tracing::info!(
        schemas = catalog.len(),
        root = %root,
        path = %path.display(),
        "loaded schema file"
    );

    let loaded = LoadedSchemas { catalog, root };
    loaded.root()?;
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const BUNDLE: &str = r#"
schemas:
  - id: Person
    strict: true
    fields:
      - name: name
        type: { type: string, min_length: 2 }
      - name: age
        type: { type: int, gt: 0 }
        required: false
      - name: address
        type: "ref[Address]"
        required: false
  - id: Address
    fields:
      - name: city
        type: str
"#;

    pub(crate) fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_bundle_with_first_document_as_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "schemas.yaml", BUNDLE);
        let loaded = load_schemas(&path, None).unwrap();
        assert_eq!(loaded.root.as_str(), "Person");
        assert_eq!(loaded.catalog.len(), 2);
        assert!(loaded.root().unwrap().is_strict());
    }

    #[test]
    fn explicit_root_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "schemas.yaml", BUNDLE);
        assert_eq!(load_schemas(&path, Some("Address")).unwrap().root.as_str(), "Address");
        let err = load_schemas(&path, Some("Company")).unwrap_err();
        assert!(err.to_string().contains("Company"), "{err}");
    }

    #[test]
    fn json_files_are_read_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "point.json",
            r#"{"id": "Point", "fields": [{"name": "x", "type": "float"}]}"#,
        );
        let loaded = load_schemas(&path, None).unwrap();
        assert_eq!(loaded.root.as_str(), "Point");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_document(Path::new("/tmp/fieldspec-no-such-file.yaml")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn build_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bad.yaml",
            "id: Bad\nfields:\n  - name: n\n    type: { type: bool, min_length: 1 }\n",
        );
        let err = load_schemas(&path, None).unwrap_err();
        assert!(format!("{err:#}").contains("min_length"), "{err:#}");
    }
}
