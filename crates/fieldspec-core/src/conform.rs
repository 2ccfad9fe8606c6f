//! # Value Conformance
//!
//! Walks a JSON value against a [`CanonicalType`], collecting every
//! path-qualified [`ValidationError`]. For each node the shape is checked
//! first; only a correctly shaped value has its constraints evaluated, and
//! every failing constraint is reported.
//!
//! Nested records ([`CanonicalType::SchemaRef`]) are delegated to a
//! [`RefValidator`] so this crate stays ignorant of registries.

use serde_json::Value;

use crate::constraint::{check, Constraint};
use crate::error::{FieldPath, PathSegment, UnresolvedReference, ValidationError};
use crate::types::{CanonicalType, SchemaId};

/// Validates values that refer to another registry.
pub trait RefValidator {
    /// Check an object `value` at `path` against the registry `target`,
    /// appending problems to `errors`.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedReference`] when `target` is not known.
    fn validate_ref(
        &self,
        target: &SchemaId,
        value: &Value,
        path: &FieldPath,
        errors: &mut Vec<ValidationError>,
    ) -> Result<(), UnresolvedReference>;
}

/// Treats every referenced record as opaque: any object is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueRefs;

impl RefValidator for OpaqueRefs {
    fn validate_ref(
        &self,
        _target: &SchemaId,
        _value: &Value,
        _path: &FieldPath,
        _errors: &mut Vec<ValidationError>,
    ) -> Result<(), UnresolvedReference> {
        Ok(())
    }
}

/// Check `value` against `ty`, appending every problem found to `errors`.
///
/// # Errors
///
/// Only an unresolvable reference is an `Err`; ordinary problems with the
/// value are pushed onto `errors`.
pub fn conform(
    ty: &CanonicalType,
    value: &Value,
    path: &FieldPath,
    refs: &dyn RefValidator,
    errors: &mut Vec<ValidationError>,
) -> Result<(), UnresolvedReference> {
    match ty {
        CanonicalType::Primitive { kind, constraints } => {
            if !kind.accepts(value) {
                errors.push(ValidationError::type_mismatch(path.clone(), kind, value));
                return Ok(());
            }
            check_constraints(constraints, value, path, errors);
        }
        CanonicalType::Array {
            element,
            constraints,
        } => {
            let Some(items) = value.as_array() else {
                errors.push(ValidationError::type_mismatch(path.clone(), ty, value));
                return Ok(());
            };
            check_constraints(constraints, value, path, errors);
            for (i, item) in items.iter().enumerate() {
                conform(element, item, &path.child(PathSegment::Index(i)), refs, errors)?;
            }
        }
        CanonicalType::Map {
            key,
            value: value_ty,
            constraints,
        } => {
            let Some(entries) = value.as_object() else {
                errors.push(ValidationError::type_mismatch(path.clone(), ty, value));
                return Ok(());
            };
            check_constraints(constraints, value, path, errors);
            for (k, v) in entries {
                let entry_path = path.child(PathSegment::Key(k.clone()));
                conform(key, &Value::String(k.clone()), &entry_path, refs, errors)?;
                conform(value_ty, v, &entry_path, refs, errors)?;
            }
        }
        CanonicalType::Union {
            variants,
            constraints,
        } => {
            if !conform_union(ty, variants, value, path, refs, errors)? {
                return Ok(());
            }
            check_constraints(constraints, value, path, errors);
        }
        CanonicalType::SchemaRef(target) => {
            if !value.is_object() {
                errors.push(ValidationError::type_mismatch(path.clone(), ty, value));
                return Ok(());
            }
            refs.validate_ref(target, value, path, errors)?;
        }
    }
    Ok(())
}

/// Returns true when some variant fully accepts the value.
///
/// Otherwise reports the errors of the single variant matching by shape, or
/// one type mismatch when zero or several variants match by shape.
fn conform_union(
    ty: &CanonicalType,
    variants: &[CanonicalType],
    value: &Value,
    path: &FieldPath,
    refs: &dyn RefValidator,
    errors: &mut Vec<ValidationError>,
) -> Result<bool, UnresolvedReference> {
    let mut shaped: Vec<Vec<ValidationError>> = Vec::new();
    for variant in variants {
        let mut attempt = Vec::new();
        conform(variant, value, path, refs, &mut attempt)?;
        if attempt.is_empty() {
            return Ok(true);
        }
        if shape_matches(variant, value) {
            shaped.push(attempt);
        }
    }
    if shaped.len() == 1 {
        errors.extend(shaped.into_iter().flatten());
    } else {
        errors.push(ValidationError::type_mismatch(path.clone(), ty, value));
    }
    Ok(false)
}

fn check_constraints(
    constraints: &[Constraint],
    value: &Value,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) {
    for c in constraints {
        if !check(c, value) {
            errors.push(ValidationError::constraint_violated(
                path.clone(),
                c.name(),
                c.explain(value),
            ));
        }
    }
}

/// Structural check only: kinds, element shapes and key shapes, no
/// constraints. Referenced records only need to be objects.
pub fn shape_matches(ty: &CanonicalType, value: &Value) -> bool {
    match ty {
        CanonicalType::Primitive { kind, .. } => kind.accepts(value),
        CanonicalType::Array { element, .. } => value
            .as_array()
            .is_some_and(|items| items.iter().all(|i| shape_matches(element, i))),
        CanonicalType::Map { value: v, .. } => value
            .as_object()
            .is_some_and(|entries| entries.values().all(|e| shape_matches(v, e))),
        CanonicalType::Union { variants, .. } => variants.iter().any(|v| shape_matches(v, value)),
        CanonicalType::SchemaRef(_) => value.is_object(),
    }
}
