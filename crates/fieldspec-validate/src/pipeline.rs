//! # Validation Pipeline
//!
//! One call runs up to five ordered stages:
//!
//! 1. **Presence**: every required field is keyed in the input; defaults are
//!    substituted. All misses are collected.
//! 2. **Per-field**: shape, then every constraint, for every present field;
//!    strict mode also rejects undeclared keys. All problems are collected
//!    together with stage 1's.
//! 3. **Cross-field hooks**: only when stages 1-2 found nothing. Hooks run in
//!    declaration order over the data so far and return the updated data;
//!    the first failure halts the chain.
//! 4. **Derived fields**: only when stage 3 succeeded. Each value gets a
//!    shape check only. The first failure halts by default
//!    ([`DerivedErrorMode::HaltOnFirst`]).
//! 5. **Materialization**: when the registry was built with it, the final
//!    data is packed into a [`Record`]. A failure here is an
//!    [`InternalConsistencyFault`], not a validation error.
//!
//! Hooks are caller code. A panicking hook is caught at the stage boundary
//! and reported as a hook failure carrying the hook's identity.

use std::panic::{catch_unwind, AssertUnwindSafe};

use fieldspec_core::{
    json_kind, shape_matches, DataMap, ErrorKind, FieldPath, ValidationError, ValidationErrors,
};
use fieldspec_registry::{Catalog, DerivedErrorMode, FieldRegistry, HookFailure, HookIdentity};
use serde_json::Value;

use crate::error::{InternalConsistencyFault, PipelineError};
use crate::fields::{check_fields, Refs};
use crate::record::Record;

/// Successful validation output.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    data: DataMap,
    record: Option<Record>,
}

impl Validated {
    /// Final data: regular fields (defaulted, hook-transformed) plus derived fields.
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn into_data(self) -> DataMap {
        self.data
    }

    /// The packed record, when the registry materializes.
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn into_record(self) -> Option<Record> {
        self.record
    }
}

/// Validation entry points on a registry.
pub trait Validate {
    /// Validate `input`; `ref[...]` types may only point at this registry.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Invalid`] with every collected problem,
    /// [`PipelineError::Unresolved`] when a `ref[...]` target is unknown, or
    /// [`PipelineError::Internal`] for an engine fault.
    fn validate(&self, input: &Value) -> Result<Validated, PipelineError>;

    /// Validate `input`, resolving `ref[...]` types through `catalog`.
    ///
    /// # Errors
    ///
    /// As for [`Validate::validate`].
    fn validate_in(&self, catalog: &Catalog, input: &Value) -> Result<Validated, PipelineError>;
}

impl Validate for FieldRegistry {
    fn validate(&self, input: &Value) -> Result<Validated, PipelineError> {
        run(self, None, input)
    }

    fn validate_in(&self, catalog: &Catalog, input: &Value) -> Result<Validated, PipelineError> {
        run(self, Some(catalog), input)
    }
}

/// Free-function form of [`Validate::validate`].
pub fn validate(registry: &FieldRegistry, input: &Value) -> Result<Validated, PipelineError> {
    run(registry, None, input)
}

/// Free-function form of [`Validate::validate_in`].
pub fn validate_in(
    registry: &FieldRegistry,
    catalog: &Catalog,
    input: &Value,
) -> Result<Validated, PipelineError> {
    run(registry, Some(catalog), input)
}

fn run(
    registry: &FieldRegistry,
    catalog: Option<&Catalog>,
    input: &Value,
) -> Result<Validated, PipelineError> {
    let id = registry.id();
    let Some(object) = input.as_object() else {
        return Err(invalid(vec![ValidationError::type_mismatch(
            FieldPath::root(),
            "object",
            input,
        )]));
    };

    // Stages 1-2
    let refs = Refs { root: registry, catalog };
    let mut errors = Vec::new();
    let mut data = check_fields(registry, object, &FieldPath::root(), &refs, &mut errors)?;
    tracing::trace!(registry = %id, errors = errors.len(), "presence and field checks done");
    if !errors.is_empty() {
        return Err(invalid(errors));
    }

    // Stage 3
    for validator in registry.validators() {
        let identity = &validator.identity;
        let outcome = call_hook(identity, || validator.hook.call(&data));
        data = match outcome {
            Ok(Value::Object(updated)) => {
                let problems = check_hook_output(registry, &updated, identity);
                if !problems.is_empty() {
                    return Err(invalid(problems));
                }
                updated
            }
            Ok(other) => {
                return Err(invalid(vec![ValidationError::new(
                    ErrorKind::HookFailed,
                    FieldPath::root(),
                    format!("hook must return an object, got {}", json_kind(&other)),
                )
                .with_hook(identity.qualified())]));
            }
            Err(failure) => {
                return Err(invalid(failure.into_errors(
                    ErrorKind::HookFailed,
                    FieldPath::root(),
                    identity,
                )));
            }
        };
    }
    tracing::trace!(registry = %id, hooks = registry.validators().len(), "cross-field hooks done");

    // Stage 4
    let mode = registry.derived_error_mode();
    let mut derived_errors = Vec::new();
    for derived in registry.derived_hooks() {
        let identity = &derived.resolved.identity;
        let path = FieldPath::field(&derived.field);
        let outcome = call_hook(identity, || derived.resolved.hook.call(&data));
        let failure = match outcome {
            Ok(value) => match registry.field(&derived.field) {
                Some(field) if shape_matches(&field.ty, &value) => {
                    data.insert(derived.field.clone(), value);
                    continue;
                }
                Some(field) => vec![ValidationError::new(
                    ErrorKind::DerivedHookFailed,
                    path,
                    format!("hook produced {}, expected {}", json_kind(&value), field.ty),
                )
                .with_hook(identity.qualified())],
                None => {
                    return Err(InternalConsistencyFault {
                        registry: id.clone(),
                        reason: format!("no descriptor for derived field '{}'", derived.field),
                    }
                    .into());
                }
            },
            Err(failure) => vec![failure.into_derived_error(path, identity)],
        };
        derived_errors.extend(failure);
        if mode == DerivedErrorMode::HaltOnFirst {
            break;
        }
    }
    tracing::trace!(registry = %id, errors = derived_errors.len(), "derived fields done");
    if !derived_errors.is_empty() {
        return Err(invalid(derived_errors));
    }

    // Stage 5
    let record = if registry.materializes() {
        Some(Record::pack(registry, &data)?)
    } else {
        None
    };

    Ok(Validated { data, record })
}

fn invalid(errors: Vec<ValidationError>) -> PipelineError {
    PipelineError::Invalid(ValidationErrors::from(errors))
}

/// Invoke a hook, turning a panic into a failure message.
fn call_hook(
    identity: &HookIdentity,
    f: impl FnOnce() -> Result<Value, HookFailure>,
) -> Result<Value, HookFailure> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::warn!(hook = %identity, panic = %message, "hook panicked");
            Err(HookFailure::Message(format!("hook panicked: {message}")))
        }
    }
}

/// A cross-field hook may rewrite values but not drop required fields or
/// change a field's shape.
fn check_hook_output(
    registry: &FieldRegistry,
    output: &DataMap,
    identity: &HookIdentity,
) -> Vec<ValidationError> {
    let mut problems = Vec::new();
    for field in registry.regular_fields() {
        let path = FieldPath::field(&field.name);
        match output.get(&field.name) {
            None if field.required => problems.push(ValidationError::new(
                ErrorKind::HookFailed,
                path,
                "hook removed a required field",
            )),
            Some(value) if !shape_matches(&field.ty, value) => {
                problems.push(ValidationError::new(
                    ErrorKind::HookFailed,
                    path,
                    format!("hook changed the value to {}, expected {}", json_kind(value), field.ty),
                ));
            }
            _ => {}
        }
    }
    problems
        .into_iter()
        .map(|e| e.with_hook(identity.qualified()))
        .collect()
}
