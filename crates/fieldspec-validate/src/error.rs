//! Pipeline outcomes that are not a validated value.

use fieldspec_core::{SchemaId, UnresolvedReference, ValidationErrors};
use thiserror::Error;

/// The engine produced state that a correctly built registry should never
/// allow. Distinct from user-facing validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("internal consistency fault in '{registry}': {reason}")]
pub struct InternalConsistencyFault {
    /// Registry being validated.
    pub registry: SchemaId,
    /// What was inconsistent.
    pub reason: String,
}

/// Why a validation call did not return validated data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The input is invalid; every collected problem is listed.
    #[error("validation failed with {count} error(s):\n{0}", count = .0.len())]
    Invalid(ValidationErrors),

    /// A `ref[...]` type names a registry that neither the validated
    /// registry nor the supplied catalog provides. `validate` without a
    /// catalog only knows the registry itself.
    #[error(transparent)]
    Unresolved(#[from] UnresolvedReference),

    /// An engine defect, not a property of the input.
    #[error(transparent)]
    Internal(#[from] InternalConsistencyFault),
}

impl PipelineError {
    /// The validation errors, when the input was invalid.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::Unresolved(_) | Self::Internal(_) => None,
        }
    }
}

impl From<ValidationErrors> for PipelineError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Invalid(errors)
    }
}
