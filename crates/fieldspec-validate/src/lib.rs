//! # fieldspec-validate: Validation Pipeline
//!
//! Validates instance data against a [`FieldRegistry`](fieldspec_registry::FieldRegistry)
//! and returns either the final data (defaulted, hook-transformed, with
//! derived fields) or every problem found.
//!
//! ```ignore
//! use fieldspec_validate::Validate;
//!
//! match registry.validate(&input) {
//!     Ok(validated) => store(validated.data()),
//!     Err(PipelineError::Invalid(errors)) => report(&errors),
//!     Err(PipelineError::Unresolved(missing)) => misconfigured(missing),
//!     Err(PipelineError::Internal(fault)) => bug(fault),
//! }
//! ```
//!
//! Registries are immutable, so concurrent validation against one registry
//! needs no locking. Hooks are assumed to be side-effect free.

pub mod error;
mod fields;
pub mod pipeline;
pub mod record;

pub use error::{InternalConsistencyFault, PipelineError};
pub use pipeline::{validate, validate_in, Validate, Validated};
pub use record::{Record, Slot};
