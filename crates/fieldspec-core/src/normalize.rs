//! # Type Normalizer
//!
//! Expands author-supplied [`TypeExpr`]s into [`CanonicalType`]s and checks,
//! once and for all, that every attached constraint is valid for the kind it
//! is attached to. A constraint/kind mismatch is a schema-authoring error:
//! it is reported here and never deferred to instance validation.
//!
//! ## Expansion
//!
//! - Shorthand strings (`"int"`, `"list[str]"`, `"a | b"`) go through
//!   [`crate::shorthand::parse`].
//! - Constraint arguments ([`ConstraintArgs`]) are expanded into canonical
//!   [`Constraint`]s in a fixed order and attached to the outermost node.
//! - [`TypeShape::Canonical`] passes an existing canonical type through, so
//!   `normalize(canonical)` returns it unchanged (idempotence).
//!
//! ## Compatibility table
//!
//! | constraint | kinds |
//! |---|---|
//! | `min_length`, `max_length` | string, array, map |
//! | `gt`, `gteq`, `lt`, `lteq`, `multiple_of` | integer, number |
//! | `pattern`, `format` | string |
//! | `choices` | string, integer, number, boolean, any, union |
//! | `unique_items` | array |

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::{Number, Value};

use crate::constraint::{check, compare_numbers, Constraint, Pattern, StringFormat};
use crate::error::NormalizationError;
use crate::shorthand;
use crate::types::{CanonicalType, PrimitiveKind, SchemaId};

// ---------------------------------------------------------------------------
// Author-facing expressions
// ---------------------------------------------------------------------------

/// Constraint arguments as written by a schema author.
///
/// Numeric arguments are kept as raw JSON values so a malformed argument in a
/// dynamically loaded definition is reported as a [`NormalizationError`]
/// rather than a parse failure. Loaded definitions fill this from the
/// detailed map form; the builder methods on [`TypeExpr`] fill it directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintArgs {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub gt: Option<Value>,
    pub gteq: Option<Value>,
    pub lt: Option<Value>,
    pub lteq: Option<Value>,
    pub multiple_of: Option<Value>,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub choices: Option<Vec<Value>>,
    pub unique_items: Option<bool>,
}

impl ConstraintArgs {
    /// Returns true when no argument is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The structural part of a type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    /// A shorthand string: a bare identifier or a composite form.
    Named(String),
    /// A list of `items`.
    Array(Box<TypeExpr>),
    /// A map; keys default to `string`.
    Map {
        keys: Option<Box<TypeExpr>>,
        values: Box<TypeExpr>,
    },
    /// Any of the listed variants.
    Union(Vec<TypeExpr>),
    /// A nested record described by another registry.
    Ref(SchemaId),
    /// An already-canonical type.
    Canonical(CanonicalType),
}

/// An author-supplied type: a shape plus constraint arguments on its outermost node.
///
/// Deserializes from either a shorthand string (`"list[int]"`) or a map:
///
/// ```yaml
/// type: string
/// min_length: 2
/// ---
/// items: { type: int, gt: 0 }
/// max_length: 10
/// ---
/// values: float
/// keys: { type: string, pattern: "^[a-z]+$" }
/// ---
/// any_of: [int, "null"]
/// ---
/// ref: Address
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawTypeExpr")]
pub struct TypeExpr {
    pub shape: TypeShape,
    pub args: ConstraintArgs,
}

impl TypeExpr {
    /// A type from its shape with no constraint arguments.
    pub fn new(shape: TypeShape) -> Self {
        Self {
            shape,
            args: ConstraintArgs::default(),
        }
    }

    /// A shorthand string type.
    pub fn named(shorthand: impl Into<String>) -> Self {
        Self::new(TypeShape::Named(shorthand.into()))
    }

    pub fn string() -> Self {
        Self::named("string")
    }

    pub fn integer() -> Self {
        Self::named("integer")
    }

    pub fn number() -> Self {
        Self::named("number")
    }

    pub fn boolean() -> Self {
        Self::named("boolean")
    }

    pub fn null() -> Self {
        Self::named("null")
    }

    pub fn any() -> Self {
        Self::named("any")
    }

    /// A list of `items`.
    pub fn array_of(items: TypeExpr) -> Self {
        Self::new(TypeShape::Array(Box::new(items)))
    }

    /// A string-keyed map of `values`.
    pub fn map_of(values: TypeExpr) -> Self {
        Self::new(TypeShape::Map {
            keys: None,
            values: Box::new(values),
        })
    }

    /// A map with a constrained key type.
    pub fn map_with_keys(keys: TypeExpr, values: TypeExpr) -> Self {
        Self::new(TypeShape::Map {
            keys: Some(Box::new(keys)),
            values: Box::new(values),
        })
    }

    /// Any of `variants`.
    pub fn union_of(variants: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::new(TypeShape::Union(variants.into_iter().collect()))
    }

    /// `inner | null`.
    pub fn optional(inner: TypeExpr) -> Self {
        Self::union_of([inner, Self::null()])
    }

    /// A reference to another registry.
    pub fn reference(target: impl Into<SchemaId>) -> Self {
        Self::new(TypeShape::Ref(target.into()))
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.args.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.args.max_length = Some(n);
        self
    }

    pub fn gt(mut self, bound: impl Into<Value>) -> Self {
        self.args.gt = Some(bound.into());
        self
    }

    pub fn gteq(mut self, bound: impl Into<Value>) -> Self {
        self.args.gteq = Some(bound.into());
        self
    }

    pub fn lt(mut self, bound: impl Into<Value>) -> Self {
        self.args.lt = Some(bound.into());
        self
    }

    pub fn lteq(mut self, bound: impl Into<Value>) -> Self {
        self.args.lteq = Some(bound.into());
        self
    }

    pub fn multiple_of(mut self, divisor: impl Into<Value>) -> Self {
        self.args.multiple_of = Some(divisor.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.args.pattern = Some(pattern.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.args.format = Some(format.into());
        self
    }

    pub fn choices(mut self, choices: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.args.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn unique_items(mut self) -> Self {
        self.args.unique_items = Some(true);
        self
    }
}

impl From<CanonicalType> for TypeExpr {
    fn from(ty: CanonicalType) -> Self {
        Self::new(TypeShape::Canonical(ty))
    }
}

impl From<&str> for TypeExpr {
    fn from(s: &str) -> Self {
        Self::named(s)
    }
}

// ---------------------------------------------------------------------------
// Serde form
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTypeExpr {
    Shorthand(String),
    Detailed(Box<DetailedTypeExpr>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DetailedTypeExpr {
    #[serde(rename = "type")]
    type_name: Option<String>,
    items: Option<RawTypeExpr>,
    values: Option<RawTypeExpr>,
    keys: Option<RawTypeExpr>,
    any_of: Option<Vec<RawTypeExpr>>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    gt: Option<Value>,
    gteq: Option<Value>,
    lt: Option<Value>,
    lteq: Option<Value>,
    multiple_of: Option<Value>,
    pattern: Option<String>,
    format: Option<String>,
    choices: Option<Vec<Value>>,
    unique_items: Option<bool>,
}

impl TryFrom<RawTypeExpr> for TypeExpr {
    type Error = NormalizationError;

    fn try_from(raw: RawTypeExpr) -> Result<Self, Self::Error> {
        let detailed = match raw {
            RawTypeExpr::Shorthand(s) => return Ok(Self::named(s)),
            RawTypeExpr::Detailed(d) => *d,
        };

        let shapes = [
            detailed.type_name.is_some(),
            detailed.items.is_some(),
            detailed.values.is_some(),
            detailed.any_of.is_some(),
            detailed.reference.is_some(),
        ];
        let count = shapes.iter().filter(|s| **s).count();
        if count != 1 {
            return Err(NormalizationError::Ambiguous(format!(
                "expected exactly one of 'type', 'items', 'values', 'any_of', 'ref'; found {count}"
            )));
        }
        if detailed.keys.is_some() && detailed.values.is_none() {
            return Err(NormalizationError::Ambiguous(
                "'keys' is only valid together with 'values'".into(),
            ));
        }

        let shape = if let Some(name) = detailed.type_name {
            TypeShape::Named(name)
        } else if let Some(items) = detailed.items {
            TypeShape::Array(Box::new(Self::try_from(items)?))
        } else if let Some(values) = detailed.values {
            TypeShape::Map {
                keys: detailed.keys.map(Self::try_from).transpose()?.map(Box::new),
                values: Box::new(Self::try_from(values)?),
            }
        } else if let Some(variants) = detailed.any_of {
            TypeShape::Union(
                variants
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            )
        } else if let Some(target) = detailed.reference {
            TypeShape::Ref(SchemaId::new(target))
        } else {
            return Err(NormalizationError::Ambiguous("no type shape given".into()));
        };

        Ok(Self {
            shape,
            args: ConstraintArgs {
                min_length: detailed.min_length,
                max_length: detailed.max_length,
                gt: detailed.gt,
                gteq: detailed.gteq,
                lt: detailed.lt,
                lteq: detailed.lteq,
                multiple_of: detailed.multiple_of,
                pattern: detailed.pattern,
                format: detailed.format,
                choices: detailed.choices,
                unique_items: detailed.unique_items,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Expand a type expression into its canonical form and verify it.
///
/// # Errors
///
/// Returns a [`NormalizationError`] for unknown identifiers, malformed
/// shorthand, constraints attached to incompatible kinds, impossible bounds,
/// invalid patterns or formats, non-string map keys, and empty unions.
pub fn normalize(expr: &TypeExpr) -> Result<CanonicalType, NormalizationError> {
    let ty = expand(expr)?;
    check_type(&ty)?;
    Ok(ty)
}

fn expand(expr: &TypeExpr) -> Result<CanonicalType, NormalizationError> {
    let base = match &expr.shape {
        TypeShape::Named(s) => shorthand::parse(s)?,
        TypeShape::Array(items) => CanonicalType::array(expand(items)?),
        TypeShape::Map { keys, values } => CanonicalType::Map {
            key: Box::new(match keys {
                Some(k) => expand(k)?,
                None => CanonicalType::primitive(PrimitiveKind::String),
            }),
            value: Box::new(expand(values)?),
            constraints: Vec::new(),
        },
        TypeShape::Union(variants) => CanonicalType::union(
            variants
                .iter()
                .map(expand)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        TypeShape::Ref(id) => CanonicalType::SchemaRef(id.clone()),
        TypeShape::Canonical(ty) => ty.clone(),
    };

    let extra = expand_args(&expr.args)?;
    if extra.is_empty() {
        return Ok(base);
    }
    match base {
        CanonicalType::Primitive {
            kind,
            mut constraints,
        } => {
            constraints.extend(extra);
            Ok(CanonicalType::Primitive { kind, constraints })
        }
        CanonicalType::Array {
            element,
            mut constraints,
        } => {
            constraints.extend(extra);
            Ok(CanonicalType::Array {
                element,
                constraints,
            })
        }
        CanonicalType::Map {
            key,
            value,
            mut constraints,
        } => {
            constraints.extend(extra);
            Ok(CanonicalType::Map {
                key,
                value,
                constraints,
            })
        }
        CanonicalType::Union {
            variants,
            mut constraints,
        } => {
            constraints.extend(extra);
            Ok(CanonicalType::Union {
                variants,
                constraints,
            })
        }
        CanonicalType::SchemaRef(id) => Err(NormalizationError::ConstraintOnReference(id)),
    }
}

fn numeric_arg(
    constraint: &'static str,
    value: &Option<Value>,
) -> Result<Option<Number>, NormalizationError> {
    match value {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.clone())),
        Some(other) => Err(NormalizationError::InvalidArgument {
            constraint,
            reason: format!("expected a number, got {other}"),
        }),
    }
}

/// Expand author arguments into canonical constraints, in canonical order.
fn expand_args(args: &ConstraintArgs) -> Result<Vec<Constraint>, NormalizationError> {
    let mut out = Vec::new();
    if let Some(n) = args.min_length {
        out.push(Constraint::MinLength(n));
    }
    if let Some(n) = args.max_length {
        out.push(Constraint::MaxLength(n));
    }
    if let Some(n) = numeric_arg("gt", &args.gt)? {
        out.push(Constraint::Gt(n));
    }
    if let Some(n) = numeric_arg("gteq", &args.gteq)? {
        out.push(Constraint::Gteq(n));
    }
    if let Some(n) = numeric_arg("lt", &args.lt)? {
        out.push(Constraint::Lt(n));
    }
    if let Some(n) = numeric_arg("lteq", &args.lteq)? {
        out.push(Constraint::Lteq(n));
    }
    if let Some(n) = numeric_arg("multiple_of", &args.multiple_of)? {
        out.push(Constraint::MultipleOf(n));
    }
    if let Some(p) = &args.pattern {
        out.push(Constraint::Pattern(Pattern::new(p)?));
    }
    if let Some(f) = &args.format {
        out.push(Constraint::Format(f.parse::<StringFormat>()?));
    }
    if let Some(choices) = &args.choices {
        out.push(Constraint::Choices(choices.clone()));
    }
    if args.unique_items == Some(true) {
        out.push(Constraint::UniqueItems);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Canonical-type verification
// ---------------------------------------------------------------------------

/// Verify that a canonical type is internally consistent.
///
/// Every constraint must be applicable to its node's kind, bounds must be
/// satisfiable, map keys must be string-kinded, and unions non-empty.
pub fn check_type(ty: &CanonicalType) -> Result<(), NormalizationError> {
    match ty {
        CanonicalType::Primitive { constraints, .. } => check_constraints(ty, constraints),
        CanonicalType::Array {
            element,
            constraints,
        } => {
            check_type(element)?;
            check_constraints(ty, constraints)
        }
        CanonicalType::Map {
            key,
            value,
            constraints,
        } => {
            check_type(key)?;
            if !is_string_kinded(key) {
                return Err(NormalizationError::InvalidMapKey(key.to_string()));
            }
            check_type(value)?;
            check_constraints(ty, constraints)
        }
        CanonicalType::Union {
            variants,
            constraints,
        } => {
            if variants.is_empty() {
                return Err(NormalizationError::EmptyUnion);
            }
            for v in variants {
                check_type(v)?;
            }
            check_constraints(ty, constraints)
        }
        CanonicalType::SchemaRef(_) => Ok(()),
    }
}

fn is_string_kinded(ty: &CanonicalType) -> bool {
    match ty {
        CanonicalType::Primitive { kind, .. } => *kind == PrimitiveKind::String,
        CanonicalType::Union { variants, .. } => variants.iter().all(is_string_kinded),
        _ => false,
    }
}

fn applicable(constraint: &Constraint, ty: &CanonicalType) -> bool {
    use PrimitiveKind as K;
    let kind = match ty {
        CanonicalType::Primitive { kind, .. } => Some(*kind),
        _ => None,
    };
    match constraint {
        Constraint::MinLength(_) | Constraint::MaxLength(_) => matches!(
            ty,
            CanonicalType::Array { .. } | CanonicalType::Map { .. }
        ) || kind == Some(K::String),
        Constraint::Gt(_)
        | Constraint::Gteq(_)
        | Constraint::Lt(_)
        | Constraint::Lteq(_)
        | Constraint::MultipleOf(_) => matches!(kind, Some(K::Integer | K::Number)),
        Constraint::Pattern(_) | Constraint::Format(_) => kind == Some(K::String),
        Constraint::Choices(_) => {
            matches!(ty, CanonicalType::Union { .. })
                || matches!(
                    kind,
                    Some(K::String | K::Integer | K::Number | K::Boolean | K::Any)
                )
        }
        Constraint::UniqueItems => matches!(ty, CanonicalType::Array { .. }),
    }
}

fn check_constraints(ty: &CanonicalType, constraints: &[Constraint]) -> Result<(), NormalizationError> {
    for c in constraints {
        if !applicable(c, ty) {
            return Err(NormalizationError::IncompatibleConstraint {
                constraint: c.name(),
                kind: ty.to_string(),
            });
        }
        match c {
            Constraint::MultipleOf(n) if n.as_f64().map_or(true, |f| f <= 0.0) => {
                return Err(NormalizationError::InvalidArgument {
                    constraint: "multiple_of",
                    reason: format!("divisor must be positive, got {n}"),
                });
            }
            Constraint::Choices(choices) => {
                if choices.is_empty() {
                    return Err(NormalizationError::InvalidArgument {
                        constraint: "choices",
                        reason: "at least one choice is required".into(),
                    });
                }
                for choice in choices {
                    if !choice_fits(ty, choice) {
                        return Err(NormalizationError::InvalidChoice {
                            choice: choice.clone(),
                            kind: ty.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    check_bounds(constraints)
}

/// Whether a choice value has the shape and satisfies the other constraints
/// of the node it is attached to.
fn choice_fits(ty: &CanonicalType, choice: &Value) -> bool {
    let shape_ok = match ty {
        CanonicalType::Primitive { kind, .. } => kind.accepts(choice),
        CanonicalType::Union { variants, .. } => variants.iter().any(|v| shape_fits(v, choice)),
        _ => false,
    };
    shape_ok
        && ty
            .constraints()
            .iter()
            .filter(|c| !matches!(c, Constraint::Choices(_)))
            .all(|c| check(c, choice))
}

fn shape_fits(ty: &CanonicalType, value: &Value) -> bool {
    match ty {
        CanonicalType::Primitive { kind, .. } => kind.accepts(value),
        CanonicalType::Array { .. } => value.is_array(),
        CanonicalType::Map { .. } | CanonicalType::SchemaRef(_) => value.is_object(),
        CanonicalType::Union { variants, .. } => variants.iter().any(|v| shape_fits(v, value)),
    }
}

/// A numeric bound and whether it is exclusive.
type Bound<'a> = (&'a Number, bool);

/// Keep whichever bound admits fewer values. `wanted` is the ordering a
/// tighter candidate has against the current bound: `Greater` for lower
/// bounds, `Less` for upper bounds. On a tie the exclusive bound wins.
fn tighten<'a>(current: Option<Bound<'a>>, candidate: Bound<'a>, wanted: Ordering) -> Option<Bound<'a>> {
    let Some(existing) = current else {
        return Some(candidate);
    };
    match compare_numbers(candidate.0, existing.0) {
        Some(ord) if ord == wanted => Some(candidate),
        Some(Ordering::Equal) if candidate.1 => Some(candidate),
        _ => Some(existing),
    }
}

fn check_bounds(constraints: &[Constraint]) -> Result<(), NormalizationError> {
    let mut min_len: Option<usize> = None;
    let mut max_len: Option<usize> = None;
    let mut lower: Option<Bound<'_>> = None;
    let mut upper: Option<Bound<'_>> = None;

    for c in constraints {
        match c {
            Constraint::MinLength(n) => min_len = Some(min_len.map_or(*n, |m| m.max(*n))),
            Constraint::MaxLength(n) => max_len = Some(max_len.map_or(*n, |m| m.min(*n))),
            Constraint::Gt(n) => lower = tighten(lower, (n, true), Ordering::Greater),
            Constraint::Gteq(n) => lower = tighten(lower, (n, false), Ordering::Greater),
            Constraint::Lt(n) => upper = tighten(upper, (n, true), Ordering::Less),
            Constraint::Lteq(n) => upper = tighten(upper, (n, false), Ordering::Less),
            _ => {}
        }
    }

    if let (Some(min), Some(max)) = (min_len, max_len) {
        if min > max {
            return Err(NormalizationError::ConflictingBounds(format!(
                "min_length {min} exceeds max_length {max}"
            )));
        }
    }
    if let (Some((lo, lo_strict)), Some((hi, hi_strict))) = (lower, upper) {
        let empty = match compare_numbers(lo, hi) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => lo_strict || hi_strict,
            _ => false,
        };
        if empty {
            return Err(NormalizationError::ConflictingBounds(format!(
                "no number satisfies lower bound {lo} and upper bound {hi}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_identifier_gets_empty_constraints() {
        let ty = normalize(&TypeExpr::string()).unwrap();
        assert_eq!(ty, CanonicalType::primitive(PrimitiveKind::String));
    }

    #[test]
    fn constraints_attach_to_outermost_node() {
        let ty = normalize(&TypeExpr::named("list[int]").min_length(1)).unwrap();
        match ty {
            CanonicalType::Array {
                element,
                constraints,
            } => {
                assert_eq!(constraints, vec![Constraint::MinLength(1)]);
                assert!(element.constraints().is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pattern_on_integer_is_an_authoring_error() {
        let err = normalize(&TypeExpr::integer().pattern("^[0-9]+$")).unwrap_err();
        assert_eq!(
            err,
            NormalizationError::IncompatibleConstraint {
                constraint: "pattern",
                kind: "integer".into()
            }
        );
    }

    #[test]
    fn nested_incompatibility_is_found() {
        let expr = TypeExpr::array_of(TypeExpr::boolean().gt(1));
        assert!(matches!(
            normalize(&expr),
            Err(NormalizationError::IncompatibleConstraint { constraint: "gt", .. })
        ));
    }

    #[test]
    fn null_accepts_no_constraints() {
        assert!(normalize(&TypeExpr::null().choices([Value::Null])).is_err());
    }

    #[test]
    fn impossible_bounds() {
        assert!(matches!(
            normalize(&TypeExpr::string().min_length(5).max_length(2)),
            Err(NormalizationError::ConflictingBounds(_))
        ));
        assert!(matches!(
            normalize(&TypeExpr::integer().gt(3).lt(3)),
            Err(NormalizationError::ConflictingBounds(_))
        ));
        assert!(normalize(&TypeExpr::integer().gteq(3).lteq(3)).is_ok());
    }

    #[test]
    fn tightest_bounds_decide_conflicts() {
        assert!(matches!(
            normalize(&TypeExpr::integer().gt(5).gteq(0).lt(3)),
            Err(NormalizationError::ConflictingBounds(_))
        ));
        assert!(matches!(
            normalize(&TypeExpr::number().gteq(0).lt(10).lteq(0)),
            Err(NormalizationError::ConflictingBounds(_))
        ));
        assert!(matches!(
            normalize(&TypeExpr::integer().gteq(3).gt(3).lteq(3)),
            Err(NormalizationError::ConflictingBounds(_))
        ));
        assert!(normalize(&TypeExpr::integer().gt(0).gteq(5).lt(6)).is_ok());
    }

    #[test]
    fn bad_arguments() {
        assert!(matches!(
            normalize(&TypeExpr::number().gt("zero")),
            Err(NormalizationError::InvalidArgument { constraint: "gt", .. })
        ));
        assert!(matches!(
            normalize(&TypeExpr::number().multiple_of(0)),
            Err(NormalizationError::InvalidArgument { constraint: "multiple_of", .. })
        ));
        assert!(matches!(
            normalize(&TypeExpr::string().pattern("(")),
            Err(NormalizationError::InvalidPattern { .. })
        ));
        assert!(matches!(
            normalize(&TypeExpr::string().format("hostname")),
            Err(NormalizationError::UnknownFormat(_))
        ));
    }

    #[test]
    fn choices_must_fit_the_kind() {
        assert!(normalize(&TypeExpr::string().choices(["a", "b"])).is_ok());
        assert!(matches!(
            normalize(&TypeExpr::string().choices([json!("a"), json!(1)])),
            Err(NormalizationError::InvalidChoice { .. })
        ));
        assert!(matches!(
            normalize(&TypeExpr::string().max_length(2).choices(["abc"])),
            Err(NormalizationError::InvalidChoice { .. })
        ));
        assert!(normalize(&TypeExpr::named("int | str").choices([json!(1), json!("x")])).is_ok());
    }

    #[test]
    fn map_keys_must_be_strings() {
        let expr = TypeExpr::map_with_keys(TypeExpr::integer(), TypeExpr::string());
        assert_eq!(
            normalize(&expr),
            Err(NormalizationError::InvalidMapKey("integer".into()))
        );
        let ok = TypeExpr::map_with_keys(TypeExpr::string().pattern("^[a-z]+$"), TypeExpr::any());
        assert!(normalize(&ok).is_ok());
    }

    #[test]
    fn references_reject_constraints() {
        assert_eq!(
            normalize(&TypeExpr::reference("Address").min_length(1)),
            Err(NormalizationError::ConstraintOnReference(SchemaId::new("Address")))
        );
    }

    #[test]
    fn empty_union_is_rejected() {
        assert_eq!(
            normalize(&TypeExpr::union_of([])),
            Err(NormalizationError::EmptyUnion)
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let exprs = [
            TypeExpr::string().min_length(2).pattern("^[A-Z]"),
            TypeExpr::named("map[list[optional[float]]]").max_length(3),
            TypeExpr::union_of([TypeExpr::integer().gt(0), TypeExpr::reference("Node")]),
        ];
        for expr in exprs {
            let once = normalize(&expr).unwrap();
            let twice = normalize(&TypeExpr::from(once.clone())).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn deserializes_shorthand_and_detailed_forms() {
        let yaml = r#"
- "list[int]"
- type: string
  min_length: 2
  format: email
- items: { type: int, gt: 0 }
  unique_items: true
- values: float
  keys: { type: string, pattern: "^[a-z]+$" }
- any_of: [int, "null"]
- ref: Address
"#;
        let exprs: Vec<TypeExpr> = serde_yaml::from_str(yaml).unwrap();
        let rendered: Vec<String> = exprs
            .iter()
            .map(|e| normalize(e).unwrap().to_string())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "list[integer]",
                "string",
                "list[integer]",
                "map[string, number]",
                "integer | null",
                "ref[Address]",
            ]
        );
    }

    #[test]
    fn detailed_form_rejects_two_shapes() {
        let result: Result<TypeExpr, _> = serde_json::from_value(json!({"type": "int", "items": "int"}));
        assert!(result.is_err());
    }

    #[test]
    fn detailed_form_rejects_unknown_keys() {
        let result: Result<TypeExpr, _> = serde_json::from_value(json!({"type": "int", "minimum": 3}));
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn primitive_expr() -> impl Strategy<Value = TypeExpr> {
        prop_oneof![
            (0usize..5, 5usize..20)
                .prop_map(|(lo, hi)| TypeExpr::string().min_length(lo).max_length(hi)),
            (-100i64..0, 0i64..100).prop_map(|(lo, hi)| TypeExpr::integer().gteq(lo).lt(hi)),
            Just(TypeExpr::number().multiple_of(0.5)),
            Just(TypeExpr::boolean()),
            Just(TypeExpr::null()),
            Just(TypeExpr::reference("Target")),
        ]
    }

    fn type_expr() -> impl Strategy<Value = TypeExpr> {
        primitive_expr().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(TypeExpr::array_of),
                inner.clone().prop_map(TypeExpr::map_of),
                prop::collection::vec(inner, 1..4).prop_map(TypeExpr::union_of),
            ]
        })
    }

    proptest! {
        /// Normalizing a canonical type returns it unchanged.
        #[test]
        fn normalize_is_idempotent(expr in type_expr()) {
            let once = normalize(&expr).unwrap();
            let twice = normalize(&TypeExpr::from(once.clone())).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
