//! Stages 1 and 2: presence and per-field validation.
//!
//! Both stages are exhaustive. Every missing required field and every
//! problem with every present field is collected before the pipeline
//! decides whether to continue. Nested records (`ref[...]`) go through the
//! same two stages against their own registry.

use fieldspec_core::{
    conform, DataMap, ErrorKind, FieldPath, PathSegment, RefValidator, SchemaId,
    UnresolvedReference, ValidationError,
};
use fieldspec_registry::{Catalog, FieldRegistry};
use serde_json::Value;

/// Resolves `ref[...]` targets against a catalog, falling back to the
/// registry being validated so self references work without one.
pub(crate) struct Refs<'a> {
    pub root: &'a FieldRegistry,
    pub catalog: Option<&'a Catalog>,
}

impl<'a> Refs<'a> {
    fn lookup(&self, target: &SchemaId) -> Option<&'a FieldRegistry> {
        self.catalog
            .and_then(|c| c.get(target))
            .or_else(|| (self.root.id() == target).then_some(self.root))
    }
}

impl RefValidator for Refs<'_> {
    fn validate_ref(
        &self,
        target: &SchemaId,
        value: &Value,
        path: &FieldPath,
        errors: &mut Vec<ValidationError>,
    ) -> Result<(), UnresolvedReference> {
        let registry = self
            .lookup(target)
            .ok_or_else(|| UnresolvedReference(target.clone()))?;
        if let Some(object) = value.as_object() {
            check_fields(registry, object, path, self, errors)?;
        }
        Ok(())
    }
}

/// Run presence and per-field checks for `registry` over `input`.
///
/// Returns the defaulted data: declared fields in registry order, then, in
/// non-strict mode, undeclared input keys in input order.
pub(crate) fn check_fields(
    registry: &FieldRegistry,
    input: &DataMap,
    base: &FieldPath,
    refs: &dyn RefValidator,
    errors: &mut Vec<ValidationError>,
) -> Result<DataMap, UnresolvedReference> {
    let at = |name: &str| base.child(PathSegment::Field(name.to_string()));
    let mut data = DataMap::new();

    // Stage 1: presence.
    for field in registry.regular_fields() {
        match (input.get(&field.name), &field.default) {
            (Some(value), _) => {
                data.insert(field.name.clone(), value.clone());
            }
            (None, Some(default)) => {
                data.insert(field.name.clone(), default.clone());
            }
            (None, None) if field.required => {
                errors.push(ValidationError::required_missing(at(&field.name)));
            }
            (None, None) => {}
        }
    }

    // Stage 2: per-field.
    for field in registry.regular_fields() {
        if let Some(value) = input.get(&field.name) {
            conform(&field.ty, value, &at(&field.name), refs, errors)?;
        }
    }
    for field in registry.derived_fields() {
        if input.contains_key(&field.name) {
            errors.push(ValidationError::new(
                ErrorKind::ReadOnlyField,
                at(&field.name),
                "derived field cannot be supplied",
            ));
        }
    }
    for (key, value) in input {
        if registry.field(key).is_some() {
            continue;
        }
        if registry.is_strict() {
            errors.push(ValidationError::new(
                ErrorKind::UnknownField,
                at(key),
                format!("unknown field '{key}'"),
            ));
        } else {
            data.insert(key.clone(), value.clone());
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldspec_core::TypeExpr;
    use fieldspec_registry::{BuildOptions, FieldDef};
    use serde_json::json;

    fn run(registry: &FieldRegistry, input: Value) -> (DataMap, Vec<ValidationError>) {
        let refs = Refs {
            root: registry,
            catalog: None,
        };
        let mut errors = Vec::new();
        let data = check_fields(
            registry,
            input.as_object().unwrap(),
            &FieldPath::root(),
            &refs,
            &mut errors,
        )
        .unwrap();
        (data, errors)
    }

    #[test]
    fn presence_collects_every_missing_field() {
        let reg = FieldRegistry::build(
            [
                FieldDef::new("a", "int"),
                FieldDef::new("b", "int"),
                FieldDef::new("c", "int").default_value(3),
            ],
            BuildOptions::new("X"),
        )
        .unwrap();
        let (data, errors) = run(&reg, json!({}));
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::RequiredMissing));
        assert_eq!(data.get("c"), Some(&json!(3)));
    }

    #[test]
    fn undeclared_keys_pass_through_unless_strict() {
        let defs = || [FieldDef::new("a", "int")];
        let lax = FieldRegistry::build(defs(), BuildOptions::new("X")).unwrap();
        let (data, errors) = run(&lax, json!({"a": 1, "extra": true}));
        assert!(errors.is_empty());
        assert_eq!(data.get("extra"), Some(&json!(true)));

        let strict = FieldRegistry::build(defs(), BuildOptions::new("X").strict()).unwrap();
        let (_, errors) = run(&strict, json!({"a": 1, "extra": true}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnknownField);
        assert_eq!(errors[0].path.to_string(), "extra");
    }

    #[test]
    fn self_reference_recurses_with_nested_paths() {
        let reg = FieldRegistry::build(
            [
                FieldDef::new("name", TypeExpr::string().min_length(1)),
                FieldDef::new("children", "list[ref[Node]]").default_value(json!([])),
            ],
            BuildOptions::new("Node"),
        )
        .unwrap();
        let (_, errors) = run(
            &reg,
            json!({"name": "root", "children": [{"name": "a"}, {"name": ""}, {}]}),
        );
        let rendered: Vec<_> = errors.iter().map(|e| (e.path.to_string(), e.kind)).collect();
        assert_eq!(
            rendered,
            vec![
                ("children[1].name".to_string(), ErrorKind::ConstraintViolated),
                ("children[2].name".to_string(), ErrorKind::RequiredMissing),
            ]
        );
    }

    #[test]
    fn unknown_target_without_catalog_is_unresolved() {
        let reg = FieldRegistry::build(
            [FieldDef::new("home", TypeExpr::reference("Address"))],
            BuildOptions::new("User"),
        )
        .unwrap();
        let refs = Refs {
            root: &reg,
            catalog: None,
        };
        let input = json!({"home": {}});
        let mut errors = Vec::new();
        let result = check_fields(&reg, input.as_object().unwrap(), &FieldPath::root(), &refs, &mut errors);
        assert_eq!(result.unwrap_err(), UnresolvedReference(SchemaId::new("Address")));
    }
}
