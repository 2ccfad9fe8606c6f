//! # Error Types: Authoring Errors and Validation Errors
//!
//! Two families of error live here:
//!
//! - [`NormalizationError`]: a schema-authoring mistake detected while a
//!   type expression is expanded into its canonical form. These are fatal
//!   and surface once, at build time.
//! - [`ValidationError`]: a single, path-qualified problem with instance
//!   data. Validation calls return these as a list ([`ValidationErrors`]),
//!   never as a panic or an early return.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::SchemaId;

// ---------------------------------------------------------------------------
// NormalizationError
// ---------------------------------------------------------------------------

/// A type expression could not be turned into a canonical type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    /// A bare identifier did not name a known primitive.
    #[error("unknown type identifier '{0}'")]
    UnknownType(String),

    /// A shorthand type string could not be parsed.
    #[error("malformed type expression '{input}' at offset {offset}: {reason}")]
    Shorthand {
        /// The full shorthand input.
        input: String,
        /// Byte offset where parsing failed.
        offset: usize,
        /// What the parser expected.
        reason: String,
    },

    /// A constraint was attached to a type kind that cannot honour it.
    #[error("constraint '{constraint}' is not applicable to {kind}")]
    IncompatibleConstraint {
        /// Constraint name (e.g. `pattern`).
        constraint: &'static str,
        /// Display form of the offending type.
        kind: String,
    },

    /// A constraint argument has the wrong shape or an impossible value.
    #[error("invalid argument for '{constraint}': {reason}")]
    InvalidArgument {
        /// Constraint name.
        constraint: &'static str,
        /// Why the argument was rejected.
        reason: String,
    },

    /// Two constraints on the same type can never be satisfied together.
    #[error("conflicting bounds: {0}")]
    ConflictingBounds(String),

    /// A `pattern` argument is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Regex compiler message.
        reason: String,
    },

    /// A `format` argument names no supported string format.
    #[error("unknown string format '{0}'")]
    UnknownFormat(String),

    /// A `choices` entry does not have the shape of the constrained kind.
    #[error("choice {choice} is not a valid {kind}")]
    InvalidChoice {
        /// The offending choice.
        choice: Value,
        /// Display form of the constrained type.
        kind: String,
    },

    /// Map keys must be string-kinded.
    #[error("map keys must be strings, got {0}")]
    InvalidMapKey(String),

    /// A union with no variants accepts nothing.
    #[error("union must have at least one variant")]
    EmptyUnion,

    /// Constraints cannot be attached to a schema reference.
    #[error("constraints cannot be attached to reference '{0}'")]
    ConstraintOnReference(SchemaId),

    /// A detailed type expression named more than one shape, or none.
    #[error("ambiguous type expression: {0}")]
    Ambiguous(String),
}

/// A value referred to a registry that could not be found.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("unresolved schema reference '{0}'")]
pub struct UnresolvedReference(pub SchemaId);

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// One step into nested instance data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A named field of a record.
    Field(String),
    /// A position in an array.
    Index(usize),
    /// An entry of a map value.
    Key(String),
}

/// Ordered sequence of segments locating a value inside instance data.
///
/// The empty path denotes the whole input (used by cross-field hooks and by
/// a non-object input).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A single-segment path naming a top-level field.
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Field(name.into())])
    }

    /// A new path extended by one segment.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path segments, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// The top-level field this path starts at, if any.
    pub fn head_field(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }
}

impl From<Vec<PathSegment>> for FieldPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Category of a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required field is absent and has no default.
    RequiredMissing,
    /// A value has the wrong JSON shape for its declared type.
    TypeMismatch,
    /// A value has the right shape but fails a constraint.
    ConstraintViolated,
    /// A cross-field hook rejected the data (or faulted).
    HookFailed,
    /// A derived-field hook failed (or faulted, or produced a mis-shaped value).
    DerivedHookFailed,
    /// Strict mode: the input carries a key the registry does not declare.
    UnknownField,
    /// The input supplies a value for a derived (read-only) field.
    ReadOnlyField,
}

impl ErrorKind {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiredMissing => "required_missing",
            Self::TypeMismatch => "type_mismatch",
            Self::ConstraintViolated => "constraint_violated",
            Self::HookFailed => "hook_failed",
            Self::DerivedHookFailed => "derived_hook_failed",
            Self::UnknownField => "unknown_field",
            Self::ReadOnlyField => "read_only_field",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single path-qualified validation problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Where in the input the problem was found.
    pub path: FieldPath,
    /// What kind of problem it is.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Name of the violated constraint, for `ConstraintViolated`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<&'static str>,
    /// Identity of the hook that produced this error, for hook failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
}

impl ValidationError {
    /// Construct an error of the given kind.
    pub fn new(kind: ErrorKind, path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
            constraint: None,
            hook: None,
        }
    }

    /// A required field is missing.
    pub fn required_missing(path: FieldPath) -> Self {
        Self::new(ErrorKind::RequiredMissing, path, "field required")
    }

    /// A value has the wrong shape.
    pub fn type_mismatch(path: FieldPath, expected: impl fmt::Display, found: &Value) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            path,
            format!("expected {expected}, found {}", json_kind(found)),
        )
    }

    /// A constraint check failed.
    pub fn constraint_violated(
        path: FieldPath,
        constraint: &'static str,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(ErrorKind::ConstraintViolated, path, message);
        err.constraint = Some(constraint);
        err
    }

    /// Attach the identity of the originating hook.
    pub fn with_hook(mut self, identity: impl Into<String>) -> Self {
        self.hook = Some(identity.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.path, self.kind, self.message)?;
        if let Some(hook) = &self.hook {
            write!(f, " (hook {hook})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Ordered collection of validation errors from one validation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// An empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append one error.
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the errors in report order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Errors of a single kind, in report order.
    pub fn by_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.0.iter().filter(move |e| e.kind == kind)
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl Extend<ValidationError> for ValidationErrors {
    fn extend<T: IntoIterator<Item = ValidationError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {e}")?;
        }
        Ok(())
    }
}

/// Short name of a JSON value's shape, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
