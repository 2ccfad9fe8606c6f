//! Generator and profile errors.

use fieldspec_core::SchemaId;
use thiserror::Error;

/// Schema generation failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    /// A `ref[...]` target is neither the root registry nor in the catalog.
    #[error("unresolved schema reference '{0}'")]
    UnresolvedReference(SchemaId),
}

/// No target profile is registered under the given name.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown target profile '{name}' (available: {available})")]
pub struct UnknownProfile {
    pub name: String,
    /// Comma-separated list of known profile names.
    pub available: String,
}
