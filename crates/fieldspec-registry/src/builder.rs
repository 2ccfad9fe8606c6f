//! # Schema Builder
//!
//! [`FieldRegistry::build`] is the only constructor of a registry. It
//! normalizes every field type, validates declared defaults, resolves hook
//! references against the [`HookTable`], and appends derived fields after
//! the regular ones. The result is immutable and can be shared across
//! threads for concurrent validation.

use std::collections::HashMap;

use fieldspec_core::{conform, normalize, FieldPath, OpaqueRefs, SchemaId, TypeExpr};
use serde::Deserialize;

use crate::error::BuildError;
use crate::field::{FieldDef, FieldDescriptor};
use crate::hooks::{HookIdentity, HookRef, HookTable, ResolvedHook};

/// How failures of derived hooks are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedErrorMode {
    /// The first failing derived hook halts derived computation.
    #[default]
    HaltOnFirst,
    /// Every derived hook runs; all failures are reported together.
    CollectAll,
}

/// A computed field.
#[derive(Debug, Clone)]
pub struct DerivedDef {
    pub name: String,
    pub type_expr: TypeExpr,
    pub hook: HookRef,
    pub description: Option<String>,
}

impl DerivedDef {
    pub fn new(name: impl Into<String>, type_expr: impl Into<TypeExpr>, hook: impl Into<HookRef>) -> Self {
        Self {
            name: name.into(),
            type_expr: type_expr.into(),
            hook: hook.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Registry-level options.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub id: SchemaId,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Reject input keys the registry does not declare.
    pub strict: bool,
    /// Pack validated data into a fixed-layout record.
    pub materialize: bool,
    /// Cross-field hooks, in execution order.
    pub validators: Vec<HookRef>,
    /// Derived fields, in computation order.
    pub derived: Vec<DerivedDef>,
    /// Table named hook references are resolved against.
    pub hooks: HookTable,
    pub derived_errors: DerivedErrorMode,
}

impl BuildOptions {
    pub fn new(id: impl Into<SchemaId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            strict: false,
            materialize: false,
            validators: Vec::new(),
            derived: Vec::new(),
            hooks: HookTable::standard(),
            derived_errors: DerivedErrorMode::default(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn materialize(mut self) -> Self {
        self.materialize = true;
        self
    }

    pub fn validator(mut self, hook: impl Into<HookRef>) -> Self {
        self.validators.push(hook.into());
        self
    }

    pub fn derived(mut self, def: DerivedDef) -> Self {
        self.derived.push(def);
        self
    }

    pub fn hooks(mut self, hooks: HookTable) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn derived_errors(mut self, mode: DerivedErrorMode) -> Self {
        self.derived_errors = mode;
        self
    }
}

/// A derived field's hook, bound to the field it produces.
#[derive(Debug, Clone)]
pub struct DerivedHook {
    pub field: String,
    pub resolved: ResolvedHook,
}

/// Immutable, ordered set of field descriptors plus hook lists.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    id: SchemaId,
    title: Option<String>,
    description: Option<String>,
    strict: bool,
    materialize: bool,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
    validators: Vec<ResolvedHook>,
    derived: Vec<DerivedHook>,
    derived_errors: DerivedErrorMode,
}

impl FieldRegistry {
    /// Build a registry from an ordered definition list.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for empty or duplicate names, types that fail
    /// normalization, defaults that fail validation, and unknown named hooks.
    pub fn build(
        defs: impl IntoIterator<Item = FieldDef>,
        options: BuildOptions,
    ) -> Result<Self, BuildError> {
        let mut fields: Vec<FieldDescriptor> = Vec::new();
        let mut index = HashMap::new();

        for (position, def) in defs.into_iter().enumerate() {
            if def.name.is_empty() {
                return Err(BuildError::EmptyName { position });
            }
            if index.contains_key(&def.name) {
                return Err(BuildError::DuplicateField(def.name));
            }
            let ty = normalize(&def.type_expr).map_err(|source| BuildError::Normalization {
                field: def.name.clone(),
                source,
            })?;

            if let Some(default) = &def.options.default {
                let mut problems = Vec::new();
                // Reference targets are unknown here; `Catalog::register_all`
                // re-checks the nested records. OpaqueRefs never fails.
                let _ = conform(&ty, default, &FieldPath::field(&def.name), &OpaqueRefs, &mut problems);
                if !problems.is_empty() {
                    let reason: Vec<String> = problems.iter().map(ToString::to_string).collect();
                    return Err(BuildError::InvalidDefault {
                        field: def.name,
                        reason: reason.join("\n"),
                    });
                }
            }

            index.insert(def.name.clone(), fields.len());
            fields.push(FieldDescriptor {
                required: def.options.required && def.options.default.is_none(),
                name: def.name,
                ty,
                default: def.options.default,
                title: def.options.title,
                description: def.options.description,
                examples: def.options.examples,
                derived: false,
                hook: None,
            });
        }

        let validators = options
            .validators
            .iter()
            .enumerate()
            .map(|(i, r)| options.hooks.resolve(r, format!("validator#{i}"), i, "validators"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut derived = Vec::with_capacity(options.derived.len());
        for (i, def) in options.derived.into_iter().enumerate() {
            if def.name.is_empty() {
                return Err(BuildError::EmptyName {
                    position: fields.len(),
                });
            }
            if index.contains_key(&def.name) {
                return Err(BuildError::DuplicateField(def.name));
            }
            let ty = normalize(&def.type_expr).map_err(|source| BuildError::Normalization {
                field: def.name.clone(),
                source,
            })?;
            let resolved = options.hooks.resolve(
                &def.hook,
                format!("{}#{i}", def.name),
                i,
                &format!("derived field '{}'", def.name),
            )?;

            index.insert(def.name.clone(), fields.len());
            fields.push(FieldDescriptor {
                name: def.name.clone(),
                ty,
                required: false,
                default: None,
                title: None,
                description: def.description,
                examples: Vec::new(),
                derived: true,
                hook: Some(resolved.identity.clone()),
            });
            derived.push(DerivedHook {
                field: def.name,
                resolved,
            });
        }

        tracing::debug!(
            registry = %options.id,
            fields = fields.len(),
            validators = validators.len(),
            derived = derived.len(),
            strict = options.strict,
            "built field registry"
        );

        Ok(Self {
            id: options.id,
            title: options.title,
            description: options.description,
            strict: options.strict,
            materialize: options.materialize,
            fields,
            index,
            validators,
            derived,
            derived_errors: options.derived_errors,
        })
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether unknown input keys are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether validation packs its output into a fixed-layout record.
    pub fn materializes(&self) -> bool {
        self.materialize
    }

    /// All descriptors: regular fields in declaration order, then derived ones.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Position of a field in the layout.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn regular_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.derived)
    }

    pub fn derived_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.derived)
    }

    /// Cross-field hooks, in execution order.
    pub fn validators(&self) -> &[ResolvedHook] {
        &self.validators
    }

    /// Derived-field hooks, in computation order.
    pub fn derived_hooks(&self) -> &[DerivedHook] {
        &self.derived
    }

    pub fn derived_error_mode(&self) -> DerivedErrorMode {
        self.derived_errors
    }

    /// Identity of the hook producing a derived field.
    pub fn hook_of(&self, field: &str) -> Option<&HookIdentity> {
        self.field(field).and_then(|f| f.hook.as_ref())
    }

    /// Every registry referenced from this one's field types, first-seen order.
    pub fn references(&self) -> Vec<&SchemaId> {
        let mut out: Vec<&SchemaId> = Vec::new();
        for field in &self.fields {
            for target in field.ty.references() {
                if !out.contains(&target) {
                    out.push(target);
                }
            }
        }
        out
    }
}
