//! # fieldspec-core: Canonical Types for Field Schemas
//!
//! This crate is the leaf of the fieldspec workspace. It defines the single
//! internal type representation every field is normalized into, the
//! constraint predicates attached to it, and the error model shared by the
//! validation pipeline and the schema generator.
//!
//! ## Key Design Principles
//!
//! 1. **One closed type representation.** [`CanonicalType`] is a tagged union
//!    matched exhaustively by every consumer. Author-facing forms
//!    ([`TypeExpr`], shorthand strings) exist only as input to [`normalize`].
//!
//! 2. **Authoring errors are caught once.** A constraint attached to a kind
//!    that cannot honour it is a [`NormalizationError`] at build time, never a
//!    surprise during validation.
//!
//! 3. **Constraints are pure predicates.** [`check`] is total: it returns a
//!    boolean for any value and never panics.
//!
//! 4. **Validation errors are data.** [`ValidationError`] carries a
//!    [`FieldPath`] and an [`ErrorKind`]; callers aggregate them in
//!    [`ValidationErrors`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fieldspec-*` crates.
//! - No `unsafe` code.

pub mod conform;
pub mod constraint;
pub mod error;
pub mod normalize;
pub mod shorthand;
pub mod types;

pub use conform::{conform, shape_matches, OpaqueRefs, RefValidator};
pub use constraint::{check, Constraint, Pattern, StringFormat};
pub use error::{
    json_kind, ErrorKind, FieldPath, NormalizationError, PathSegment, UnresolvedReference,
    ValidationError, ValidationErrors,
};
pub use normalize::{check_type, normalize, ConstraintArgs, TypeExpr, TypeShape};
pub use types::{CanonicalType, PrimitiveKind, SchemaId};

/// A JSON object: the input and output shape of every validation call.
pub type DataMap = serde_json::Map<String, serde_json::Value>;
