//! # Catalog
//!
//! An ordered set of registries keyed by [`SchemaId`], used to resolve
//! `ref[...]` types during validation and schema generation.
//!
//! Registration checks that every referenced target exists. A registry may
//! reference itself, and a batch passed to [`Catalog::register_all`] may
//! reference its own members, so recursive and mutually recursive schemas
//! are supported without any registry holding another.
//!
//! Defaults of fields whose type contains a reference can only be checked
//! once the targets are known, so registration also validates them.

use std::collections::{HashMap, HashSet};

use fieldspec_core::{
    conform, ErrorKind, FieldPath, PathSegment, RefValidator, SchemaId, UnresolvedReference,
    ValidationError,
};
use serde_json::Value;

use crate::builder::FieldRegistry;
use crate::error::BuildError;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    registries: Vec<FieldRegistry>,
    index: HashMap<SchemaId, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one registry. Its references must point at itself or at a
    /// registry already in the catalog.
    ///
    /// # Errors
    ///
    /// [`BuildError::DuplicateSchema`] or [`BuildError::UnresolvedReference`].
    pub fn register(&mut self, registry: FieldRegistry) -> Result<&FieldRegistry, BuildError> {
        self.register_all([registry])?;
        let last = self.registries.len() - 1;
        Ok(&self.registries[last])
    }

    /// Add a batch of registries atomically. References may point at any
    /// member of the batch or of the catalog.
    ///
    /// # Errors
    ///
    /// Nothing is added when any registry is a duplicate, references an
    /// unknown schema, or declares a default that does not validate against
    /// a referenced schema ([`BuildError::InvalidDefault`]).
    pub fn register_all(
        &mut self,
        registries: impl IntoIterator<Item = FieldRegistry>,
    ) -> Result<(), BuildError> {
        let batch: Vec<FieldRegistry> = registries.into_iter().collect();

        let mut batch_ids = HashSet::new();
        for reg in &batch {
            if self.index.contains_key(reg.id()) || !batch_ids.insert(reg.id().clone()) {
                return Err(BuildError::DuplicateSchema(reg.id().clone()));
            }
        }
        for reg in &batch {
            if let Some(target) = reg
                .references()
                .into_iter()
                .find(|t| !self.index.contains_key(*t) && !batch_ids.contains(*t))
            {
                return Err(BuildError::UnresolvedReference {
                    registry: reg.id().clone(),
                    target: target.clone(),
                });
            }
        }

        let known = KnownRefs {
            registries: self.registries.iter().chain(&batch).map(|r| (r.id(), r)).collect(),
        };
        for reg in &batch {
            check_defaults(reg, &known)?;
        }

        for reg in batch {
            tracing::debug!(registry = %reg.id(), fields = reg.fields().len(), "registered schema");
            self.index.insert(reg.id().clone(), self.registries.len());
            self.registries.push(reg);
        }
        Ok(())
    }

    pub fn get(&self, id: &SchemaId) -> Option<&FieldRegistry> {
        self.index.get(id).map(|&i| &self.registries[i])
    }

    pub fn contains(&self, id: &SchemaId) -> bool {
        self.index.contains_key(id)
    }

    /// Registries in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldRegistry> {
        self.registries.iter()
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}

/// Re-check every default of `registry` with references resolved.
fn check_defaults(registry: &FieldRegistry, refs: &KnownRefs<'_>) -> Result<(), BuildError> {
    for field in registry.regular_fields() {
        let Some(default) = &field.default else {
            continue;
        };
        let mut problems = Vec::new();
        conform(&field.ty, default, &FieldPath::field(&field.name), refs, &mut problems).map_err(
            |UnresolvedReference(target)| BuildError::UnresolvedReference {
                registry: registry.id().clone(),
                target,
            },
        )?;
        if !problems.is_empty() {
            let reason: Vec<String> = problems.iter().map(ToString::to_string).collect();
            return Err(BuildError::InvalidDefault {
                field: field.name.clone(),
                reason: reason.join("\n"),
            });
        }
    }
    Ok(())
}

/// Nested record checks against registries known at registration time:
/// required presence, every present field, read-only derived keys and
/// strict-mode unknown keys.
struct KnownRefs<'a> {
    registries: HashMap<&'a SchemaId, &'a FieldRegistry>,
}

impl RefValidator for KnownRefs<'_> {
    fn validate_ref(
        &self,
        target: &SchemaId,
        value: &Value,
        path: &FieldPath,
        errors: &mut Vec<ValidationError>,
    ) -> Result<(), UnresolvedReference> {
        let registry = self
            .registries
            .get(target)
            .copied()
            .ok_or_else(|| UnresolvedReference(target.clone()))?;
        let Some(object) = value.as_object() else {
            return Ok(());
        };
        let at = |name: &str| path.child(PathSegment::Field(name.to_string()));

        for field in registry.regular_fields() {
            match object.get(&field.name) {
                Some(nested) => conform(&field.ty, nested, &at(&field.name), self, errors)?,
                None if field.required => errors.push(ValidationError::required_missing(at(&field.name))),
                None => {}
            }
        }
        for field in registry.derived_fields() {
            if object.contains_key(&field.name) {
                errors.push(ValidationError::new(
                    ErrorKind::ReadOnlyField,
                    at(&field.name),
                    "derived field cannot be supplied",
                ));
            }
        }
        if registry.is_strict() {
            for key in object.keys().filter(|k| registry.field(k).is_none()) {
                errors.push(ValidationError::new(
                    ErrorKind::UnknownField,
                    at(key),
                    format!("unknown field '{key}'"),
                ));
            }
        }
        Ok(())
    }
}
