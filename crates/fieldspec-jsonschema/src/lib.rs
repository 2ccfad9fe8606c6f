//! # fieldspec-jsonschema: Schema Emission
//!
//! Describes a [`FieldRegistry`](fieldspec_registry::FieldRegistry) as a JSON
//! Schema document and post-processes such documents.
//!
//! ## Pipeline
//!
//! ```text
//! FieldRegistry ──generate──▶ document ──resolve / flatten──▶ document
//!                                        ──enforce_target_profile──▶ document
//! ```
//!
//! - [`generate`]: one document per call. Referenced registries are emitted
//!   once each under the definitions key; the reference store lives only for
//!   the duration of the call.
//! - [`resolve`] / [`flatten`]: inline local references with a depth bound.
//! - [`enforce_target_profile`]: rewrite for a named consumer dialect.
//!
//! ## Design
//!
//! Documents are plain `serde_json::Value`s so they can be fed directly into
//! any JSON Schema validator; the crate's tests check generated documents
//! with the `jsonschema` crate.

mod context;
pub mod error;
pub mod generate;
pub mod profile;
pub mod resolve;

pub use error::{GenerateError, UnknownProfile};
pub use generate::{generate, generate_in, GenerateOptions};
pub use profile::{enforce_target_profile, profile_by_name, profiles, TargetProfile};
pub use resolve::{count_refs, flatten, resolve, ResolveOptions};
