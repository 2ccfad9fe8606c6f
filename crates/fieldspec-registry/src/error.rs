//! Build-time errors.

use fieldspec_core::{NormalizationError, SchemaId};
use thiserror::Error;

/// A field registry (or a catalog of them) could not be built.
///
/// Every variant is a schema-authoring mistake and is raised exactly once,
/// when the registry is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A field or derived field has an empty name.
    #[error("field at position {position} has an empty name")]
    EmptyName {
        /// Zero-based position in the definition list.
        position: usize,
    },

    /// Two fields (regular or derived) share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),

    /// A field's type expression failed normalization.
    #[error("field '{field}': {source}")]
    Normalization {
        /// The field whose type is invalid.
        field: String,
        /// What the normalizer rejected.
        #[source]
        source: NormalizationError,
    },

    /// A named hook is not present in the hook table.
    #[error("unknown hook '{name}' referenced by {referrer}")]
    UnknownHook {
        /// The hook name as written.
        name: String,
        /// `validators` or the derived field that referenced it.
        referrer: String,
    },

    /// A declared default does not validate against its own field type.
    #[error("default value for field '{field}' is invalid: {reason}")]
    InvalidDefault {
        /// The field carrying the default.
        field: String,
        /// The validation problems, one per line.
        reason: String,
    },

    /// A registry references a schema the catalog does not contain.
    #[error("schema '{registry}' references unknown schema '{target}'")]
    UnresolvedReference {
        /// The referring registry.
        registry: SchemaId,
        /// The missing target.
        target: SchemaId,
    },

    /// A catalog already holds a registry with this id.
    #[error("schema '{0}' is already registered")]
    DuplicateSchema(SchemaId),
}
