//! # Validation Pipeline Flows
//!
//! End-to-end tests that build registries with `fieldspec-registry` and run
//! them through the `fieldspec-validate` pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fieldspec_core::{ErrorKind, FieldPath, TypeExpr, ValidationError};
use fieldspec_registry::{
    BuildOptions, Catalog, DerivedDef, DerivedErrorMode, FieldDef, FieldRegistry, HookFailure,
    HookRef,
};
use fieldspec_validate::{PipelineError, Validate};
use serde::Deserialize;
use serde_json::{json, Value};

fn errors_of(result: Result<fieldspec_validate::Validated, PipelineError>) -> Vec<(String, ErrorKind)> {
    match result {
        Err(PipelineError::Invalid(errors)) => errors
            .iter()
            .map(|e| (e.path.to_string(), e.kind))
            .collect(),
        other => panic!("expected validation errors, got {other:?}"),
    }
}

fn person() -> FieldRegistry {
    FieldRegistry::build(
        [
            FieldDef::new("name", TypeExpr::string().min_length(2)),
            FieldDef::new("age", TypeExpr::integer().gteq(0).lt(150)),
            FieldDef::new("email", TypeExpr::string().format("email")).optional(),
        ],
        BuildOptions::new("Person"),
    )
    .unwrap()
}

// =========================================================================
// Field-level checks
// =========================================================================

#[test]
fn short_name_and_wrong_age_type_are_both_reported() {
    let errors = errors_of(person().validate(&json!({"name": "A", "age": "ten"})));
    assert_eq!(
        errors,
        vec![
            ("name".to_string(), ErrorKind::ConstraintViolated),
            ("age".to_string(), ErrorKind::TypeMismatch),
        ]
    );
}

#[test]
fn every_missing_required_field_is_reported() {
    let defs: Vec<FieldDef> = (0..7)
        .map(|i| FieldDef::new(format!("f{i}"), "int"))
        .collect();
    let registry = FieldRegistry::build(defs, BuildOptions::new("Wide")).unwrap();

    let errors = errors_of(registry.validate(&json!({"f3": 3})));
    assert_eq!(errors.len(), 6);
    assert!(errors.iter().all(|(_, kind)| *kind == ErrorKind::RequiredMissing));
    assert!(!errors.iter().any(|(path, _)| path == "f3"));
}

#[test]
fn defaults_fill_absent_fields() {
    let registry = FieldRegistry::build(
        [
            FieldDef::new("name", "str"),
            FieldDef::new("tags", "list[str]").default_value(json!([])),
            FieldDef::new("role", TypeExpr::string().choices(["admin", "user"])).default_value("user"),
        ],
        BuildOptions::new("Account"),
    )
    .unwrap();
    let validated = registry.validate(&json!({"name": "Ada"})).unwrap();
    assert_eq!(
        Value::Object(validated.into_data()),
        json!({"name": "Ada", "tags": [], "role": "user"})
    );
}

#[test]
fn nested_errors_carry_full_paths() {
    let address = FieldRegistry::build(
        [FieldDef::new("zip", TypeExpr::string().pattern(r"^\d{5}$"))],
        BuildOptions::new("Address"),
    )
    .unwrap();
    let customer = FieldRegistry::build(
        [FieldDef::new("addresses", "list[ref[Address]]")],
        BuildOptions::new("Customer"),
    )
    .unwrap();
    let mut catalog = Catalog::new();
    catalog.register_all([address, customer]).unwrap();
    let customer = catalog.get(&"Customer".into()).unwrap();

    let errors = errors_of(customer.validate_in(
        &catalog,
        &json!({"addresses": [{"zip": "12345"}, {"zip": "abc"}, {}]}),
    ));
    assert_eq!(
        errors,
        vec![
            ("addresses[1].zip".to_string(), ErrorKind::ConstraintViolated),
            ("addresses[2].zip".to_string(), ErrorKind::RequiredMissing),
        ]
    );
}

// =========================================================================
// Hooks
// =========================================================================

fn signup(derived_calls: Arc<AtomicUsize>) -> FieldRegistry {
    FieldRegistry::build(
        [
            FieldDef::new("password", TypeExpr::string().min_length(8)),
            FieldDef::new("confirm", "str"),
        ],
        BuildOptions::new("Signup")
            .validator(HookRef::inline(|data| {
                if data.get("password") == data.get("confirm") {
                    Ok(Value::Object(data.clone()))
                } else {
                    Err(HookFailure::message("passwords do not match"))
                }
            }))
            .derived(DerivedDef::new(
                "strength",
                "int",
                HookRef::inline(move |data| {
                    derived_calls.fetch_add(1, Ordering::SeqCst);
                    let len = data.get("password").and_then(Value::as_str).map_or(0, str::len);
                    Ok(json!(len))
                }),
            )),
    )
    .unwrap()
}

#[test]
fn failing_cross_field_hook_reports_once_and_skips_derived_fields() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = signup(calls.clone());

    let result = registry.validate(&json!({"password": "correct horse", "confirm": "battery"}));
    let Err(PipelineError::Invalid(errors)) = result else {
        panic!("expected a hook failure");
    };
    assert_eq!(errors.len(), 1);
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, ErrorKind::HookFailed);
    assert_eq!(error.message, "passwords do not match");
    assert_eq!(error.hook.as_deref(), Some("validator#0"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let ok = registry
        .validate(&json!({"password": "correct horse", "confirm": "correct horse"}))
        .unwrap();
    assert_eq!(ok.get("strength"), Some(&json!(13)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn derived_full_name_is_computed_after_validation() {
    let registry = FieldRegistry::build(
        [FieldDef::new("first", "str"), FieldDef::new("last", "str")],
        BuildOptions::new("Name").validator("strip_whitespace").derived(DerivedDef::new(
            "full_name",
            "str",
            HookRef::inline(|data| {
                let part = |k: &str| data.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
                Ok(json!(format!("{} {}", part("first"), part("last"))))
            }),
        )),
    )
    .unwrap();

    let validated = registry.validate(&json!({"first": " Jane", "last": "Doe "})).unwrap();
    assert_eq!(validated.get("full_name"), Some(&json!("Jane Doe")));

    // A supplied derived value is rejected, not overwritten.
    let errors = errors_of(registry.validate(&json!({"first": "J", "last": "D", "full_name": "x"})));
    assert_eq!(errors, vec![("full_name".to_string(), ErrorKind::ReadOnlyField)]);
}

#[test]
fn derived_failures_collect_when_configured() {
    let failing = || HookRef::inline(|_| Err(HookFailure::message("unavailable")));
    let build = |mode: DerivedErrorMode| {
        FieldRegistry::build(
            [FieldDef::new("x", "int")],
            BuildOptions::new("D")
                .derived(DerivedDef::new("a", "int", failing()))
                .derived(DerivedDef::new("b", "int", failing()))
                .derived_errors(mode),
        )
        .unwrap()
    };

    let halted = errors_of(build(DerivedErrorMode::HaltOnFirst).validate(&json!({"x": 1})));
    assert_eq!(halted, vec![("a".to_string(), ErrorKind::DerivedHookFailed)]);

    let collected = errors_of(build(DerivedErrorMode::CollectAll).validate(&json!({"x": 1})));
    assert_eq!(
        collected,
        vec![
            ("a".to_string(), ErrorKind::DerivedHookFailed),
            ("b".to_string(), ErrorKind::DerivedHookFailed),
        ]
    );
}

#[test]
fn prebuilt_derived_failures_become_one_error_per_field() {
    let registry = FieldRegistry::build(
        [FieldDef::new("x", "int")],
        BuildOptions::new("D")
            .derived(DerivedDef::new(
                "single",
                "int",
                HookRef::inline(|_| {
                    Err(ValidationError::new(ErrorKind::RequiredMissing, FieldPath::field("x"), "m0").into())
                }),
            ))
            .derived(DerivedDef::new(
                "several",
                "int",
                HookRef::inline(|_| {
                    Err(HookFailure::Errors(vec![
                        ValidationError::new(ErrorKind::RequiredMissing, FieldPath::field("x"), "m1"),
                        ValidationError::new(ErrorKind::TypeMismatch, FieldPath::field("y"), "m2"),
                    ]))
                }),
            ))
            .derived_errors(DerivedErrorMode::CollectAll),
    )
    .unwrap();

    let Err(PipelineError::Invalid(errors)) = registry.validate(&json!({"x": 1})) else {
        panic!("expected derived failures");
    };
    let got: Vec<_> = errors
        .iter()
        .map(|e| (e.path.to_string(), e.kind, e.hook.clone(), e.message.clone()))
        .collect();
    assert_eq!(
        got,
        vec![
            (
                "single".to_string(),
                ErrorKind::DerivedHookFailed,
                Some("single#0".to_string()),
                "m0".to_string()
            ),
            (
                "several".to_string(),
                ErrorKind::DerivedHookFailed,
                Some("several#1".to_string()),
                "m1; m2".to_string()
            ),
        ]
    );
}

#[test]
fn panicking_derived_hook_halts_remaining_derived_fields() {
    let later = Arc::new(AtomicUsize::new(0));
    let counter = later.clone();
    let registry = FieldRegistry::build(
        [FieldDef::new("x", "int")],
        BuildOptions::new("D")
            .derived(DerivedDef::new("a", "int", HookRef::inline(|_| panic!("derived boom"))))
            .derived(DerivedDef::new(
                "b",
                "int",
                HookRef::inline(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(2))
                }),
            )),
    )
    .unwrap();

    let Err(PipelineError::Invalid(errors)) = registry.validate(&json!({"x": 1})) else {
        panic!("expected a derived hook failure");
    };
    assert_eq!(errors.len(), 1);
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, ErrorKind::DerivedHookFailed);
    assert_eq!(error.path.to_string(), "a");
    assert_eq!(error.hook.as_deref(), Some("a#0"));
    assert!(error.message.contains("derived boom"), "{}", error.message);
    assert_eq!(later.load(Ordering::SeqCst), 0);
}

#[test]
fn panicking_hook_becomes_a_hook_error() {
    let registry = FieldRegistry::build(
        [FieldDef::new("x", "int")],
        BuildOptions::new("P").validator(HookRef::inline(|_| panic!("boom"))),
    )
    .unwrap();
    let Err(PipelineError::Invalid(errors)) = registry.validate(&json!({"x": 1})) else {
        panic!("expected a hook failure");
    };
    let error = errors.iter().next().unwrap();
    assert_eq!(error.kind, ErrorKind::HookFailed);
    assert!(error.message.contains("boom"), "{}", error.message);
}

// =========================================================================
// Records
// =========================================================================

#[derive(Debug, Deserialize, PartialEq)]
struct Point {
    x: f64,
    y: f64,
    label: Option<String>,
    norm: f64,
}

#[test]
fn record_round_trips_into_a_typed_struct() {
    let registry = FieldRegistry::build(
        [
            FieldDef::new("x", "float"),
            FieldDef::new("y", "float"),
            FieldDef::new("label", "optional[str]").optional(),
        ],
        BuildOptions::new("Point").materialize().derived(DerivedDef::new(
            "norm",
            "float",
            HookRef::inline(|data| {
                let x = data.get("x").and_then(Value::as_f64).unwrap_or_default();
                let y = data.get("y").and_then(Value::as_f64).unwrap_or_default();
                Ok(json!((x * x + y * y).sqrt()))
            }),
        )),
    )
    .unwrap();

    let validated = registry.validate(&json!({"x": 3.0, "y": 4.0})).unwrap();
    let record = validated.record().unwrap();
    let names: Vec<&str> = record.layout().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y", "label", "norm"]);
    assert_eq!(record.get("label"), None);

    let point: Point = record.deserialize_into().unwrap();
    assert_eq!(
        point,
        Point {
            x: 3.0,
            y: 4.0,
            label: None,
            norm: 5.0
        }
    );
}

#[test]
fn registries_are_shared_across_threads() {
    let registry = Arc::new(person());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let input = json!({"name": format!("user-{i}"), "age": i});
                registry.validate(&input).map(|v| v.into_data())
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
}
