//! # Constraint Engine
//!
//! Pure predicates bound to canonical type kinds. [`check`] is total: it
//! never panics and never fails. A constraint evaluated against a value of a
//! kind it does not govern is vacuously satisfied, because mismatched
//! shapes are reported by the shape check that runs first, and mismatched
//! constraint/kind pairings never survive [`crate::normalize`].

use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::NormalizationError;

/// A compiled regular expression that compares by its source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern. Matching uses search semantics (unanchored), as
    /// JSON Schema's `pattern` keyword does.
    pub fn new(source: &str) -> Result<Self, NormalizationError> {
        Regex::new(source)
            .map(Self)
            .map_err(|e| NormalizationError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.as_str())
    }
}

/// Named string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    DateTime,
    Date,
    Time,
    Email,
    Uri,
    Uuid,
    Ipv4,
    Ipv6,
}

impl StringFormat {
    /// The JSON Schema `format` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Time => "time",
            Self::Email => "email",
            Self::Uri => "uri",
            Self::Uuid => "uuid",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }

    /// Whether `text` is a well-formed instance of this format.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::DateTime => chrono::DateTime::parse_from_rfc3339(text).is_ok(),
            Self::Date => chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
            Self::Time => chrono::NaiveTime::parse_from_str(text, "%H:%M:%S%.f").is_ok(),
            Self::Email => is_email(text),
            Self::Uri => url::Url::parse(text).is_ok(),
            Self::Uuid => uuid::Uuid::parse_str(text).is_ok(),
            Self::Ipv4 => Ipv4Addr::from_str(text).is_ok(),
            Self::Ipv6 => Ipv6Addr::from_str(text).is_ok(),
        }
    }
}

impl FromStr for StringFormat {
    type Err = NormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date-time" => Ok(Self::DateTime),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "email" => Ok(Self::Email),
            "uri" => Ok(Self::Uri),
            "uuid" => Ok(Self::Uuid),
            "ipv4" => Ok(Self::Ipv4),
            "ipv6" => Ok(Self::Ipv6),
            other => Err(NormalizationError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !text.chars().any(char::is_whitespace)
}

/// A named, parameterized predicate attached to a canonical type.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Minimum length: characters for strings, items for arrays, entries for maps.
    MinLength(usize),
    /// Maximum length, measured as for `MinLength`.
    MaxLength(usize),
    /// Strictly greater than.
    Gt(Number),
    /// Greater than or equal.
    Gteq(Number),
    /// Strictly less than.
    Lt(Number),
    /// Less than or equal.
    Lteq(Number),
    /// Evenly divisible by a positive number.
    MultipleOf(Number),
    /// Regular expression search.
    Pattern(Pattern),
    /// Named string format.
    Format(StringFormat),
    /// Enumerated-choice membership.
    Choices(Vec<Value>),
    /// Array items are pairwise distinct.
    UniqueItems,
}

impl Constraint {
    /// Stable snake_case name, as written by schema authors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MinLength(_) => "min_length",
            Self::MaxLength(_) => "max_length",
            Self::Gt(_) => "gt",
            Self::Gteq(_) => "gteq",
            Self::Lt(_) => "lt",
            Self::Lteq(_) => "lteq",
            Self::MultipleOf(_) => "multiple_of",
            Self::Pattern(_) => "pattern",
            Self::Format(_) => "format",
            Self::Choices(_) => "choices",
            Self::UniqueItems => "unique_items",
        }
    }

    /// Message for a value that failed this constraint.
    pub fn explain(&self, value: &Value) -> String {
        match self {
            Self::MinLength(n) => format!(
                "length {} is less than the minimum of {n}",
                length_of(value).unwrap_or(0)
            ),
            Self::MaxLength(n) => format!(
                "length {} exceeds the maximum of {n}",
                length_of(value).unwrap_or(0)
            ),
            Self::Gt(n) => format!("{value} must be greater than {n}"),
            Self::Gteq(n) => format!("{value} must be greater than or equal to {n}"),
            Self::Lt(n) => format!("{value} must be less than {n}"),
            Self::Lteq(n) => format!("{value} must be less than or equal to {n}"),
            Self::MultipleOf(n) => format!("{value} is not a multiple of {n}"),
            Self::Pattern(p) => format!("{value} does not match pattern '{}'", p.as_str()),
            Self::Format(f) => format!("{value} is not a valid {f}"),
            Self::Choices(choices) => {
                let list: Vec<String> = choices.iter().map(Value::to_string).collect();
                format!("{value} is not one of [{}]", list.join(", "))
            }
            Self::UniqueItems => "array items are not unique".to_string(),
        }
    }
}

/// Evaluate one constraint against one value.
pub fn check(constraint: &Constraint, value: &Value) -> bool {
    match constraint {
        Constraint::MinLength(min) => length_of(value).map_or(true, |len| len >= *min),
        Constraint::MaxLength(max) => length_of(value).map_or(true, |len| len <= *max),
        Constraint::Gt(bound) => compare_to(value, bound).map_or(true, |o| o == Ordering::Greater),
        Constraint::Gteq(bound) => compare_to(value, bound).map_or(true, |o| o != Ordering::Less),
        Constraint::Lt(bound) => compare_to(value, bound).map_or(true, |o| o == Ordering::Less),
        Constraint::Lteq(bound) => compare_to(value, bound).map_or(true, |o| o != Ordering::Greater),
        Constraint::MultipleOf(divisor) => match value {
            Value::Number(n) => is_multiple_of(n, divisor),
            _ => true,
        },
        Constraint::Pattern(pattern) => value.as_str().map_or(true, |s| pattern.is_match(s)),
        Constraint::Format(format) => value.as_str().map_or(true, |s| format.matches(s)),
        Constraint::Choices(choices) => choices.iter().any(|c| values_equal(c, value)),
        Constraint::UniqueItems => match value {
            Value::Array(items) => items.iter().enumerate().all(|(i, a)| {
                items[i + 1..].iter().all(|b| !values_equal(a, b))
            }),
            _ => true,
        },
    }
}

/// Length of a string (in chars), array, or object; `None` for other shapes.
pub fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

fn compare_to(value: &Value, bound: &Number) -> Option<Ordering> {
    match value {
        Value::Number(n) => compare_numbers(n, bound),
        _ => None,
    }
}

fn as_i128(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Compare two JSON numbers: exactly when both are integers, through `f64`
/// otherwise. Returns `None` only for NaN, which JSON cannot carry.
pub fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (as_i128(a), as_i128(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn is_multiple_of(n: &Number, divisor: &Number) -> bool {
    if let (Some(x), Some(d)) = (as_i128(n), as_i128(divisor)) {
        return d != 0 && x % d == 0;
    }
    match (n.as_f64(), divisor.as_f64()) {
        (Some(x), Some(d)) if d != 0.0 => {
            let q = x / d;
            (q - q.round()).abs() <= f64::EPSILON * q.abs().max(1.0)
        }
        _ => false,
    }
}

/// Structural equality where numbers compare by value (`1 == 1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: Value) -> Number {
        match v {
            Value::Number(n) => n,
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn strict_vs_inclusive_comparison() {
        assert!(!check(&Constraint::Gt(num(json!(0))), &json!(0)));
        assert!(check(&Constraint::Gteq(num(json!(0))), &json!(0)));
        assert!(!check(&Constraint::Lt(num(json!(10))), &json!(10)));
        assert!(check(&Constraint::Lteq(num(json!(10))), &json!(10)));
        assert!(check(&Constraint::Gt(num(json!(0.5))), &json!(1)));
        assert!(!check(&Constraint::Gt(num(json!(0))), &json!(-1)));
    }

    #[test]
    fn integer_comparison_is_exact_at_large_magnitudes() {
        let big = num(json!(9_007_199_254_740_993_i64));
        assert!(check(&Constraint::Gt(num(json!(9_007_199_254_740_992_i64))), &Value::Number(big)));
        let max = num(json!(u64::MAX));
        assert!(check(&Constraint::Gt(num(json!(-1))), &Value::Number(max)));
    }

    #[test]
    fn length_counts_chars_items_and_entries() {
        assert!(check(&Constraint::MinLength(2), &json!("héllo")));
        assert!(!check(&Constraint::MaxLength(4), &json!("héllo")));
        assert!(check(&Constraint::MaxLength(2), &json!([1, 2])));
        assert!(!check(&Constraint::MinLength(2), &json!({"a": 1})));
    }

    #[test]
    fn pattern_uses_search_semantics() {
        let p = Constraint::Pattern(Pattern::new(r"\d{3}").unwrap());
        assert!(check(&p, &json!("abc123def")));
        assert!(!check(&p, &json!("12")));
    }

    #[test]
    fn choices_compare_numbers_by_value() {
        let c = Constraint::Choices(vec![json!(1), json!("one")]);
        assert!(check(&c, &json!(1.0)));
        assert!(check(&c, &json!("one")));
        assert!(!check(&c, &json!("two")));
    }

    #[test]
    fn multiple_of_integers_and_floats() {
        assert!(check(&Constraint::MultipleOf(num(json!(5))), &json!(15)));
        assert!(!check(&Constraint::MultipleOf(num(json!(5))), &json!(16)));
        assert!(check(&Constraint::MultipleOf(num(json!(0.1))), &json!(0.3)));
        assert!(!check(&Constraint::MultipleOf(num(json!(0.25))), &json!(0.3)));
    }

    #[test]
    fn unique_items_detects_numeric_duplicates() {
        assert!(check(&Constraint::UniqueItems, &json!([1, 2, 3])));
        assert!(!check(&Constraint::UniqueItems, &json!([1, 2, 1.0])));
        assert!(!check(&Constraint::UniqueItems, &json!([{"a": 1}, {"a": 1}])));
    }

    #[test]
    fn formats() {
        let f = |fmt: StringFormat, s: &str| check(&Constraint::Format(fmt), &json!(s));
        assert!(f(StringFormat::DateTime, "2026-01-15T12:00:00Z"));
        assert!(!f(StringFormat::DateTime, "2026-01-15"));
        assert!(f(StringFormat::Date, "2026-01-15"));
        assert!(f(StringFormat::Time, "12:30:00"));
        assert!(f(StringFormat::Email, "jane@example.org"));
        assert!(!f(StringFormat::Email, "jane@localhost"));
        assert!(f(StringFormat::Uri, "https://example.org/a?b=c"));
        assert!(f(StringFormat::Uuid, "67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(f(StringFormat::Ipv4, "10.0.0.1"));
        assert!(!f(StringFormat::Ipv4, "10.0.0.256"));
        assert!(f(StringFormat::Ipv6, "::1"));
    }

    #[test]
    fn inapplicable_pairings_are_vacuously_true() {
        assert!(check(&Constraint::MinLength(3), &json!(12)));
        assert!(check(&Constraint::Gt(num(json!(100))), &json!("abc")));
        assert!(check(&Constraint::UniqueItems, &json!("aa")));
    }

    #[test]
    fn unknown_format_name_is_rejected() {
        assert_eq!(
            "hostname".parse::<StringFormat>(),
            Err(NormalizationError::UnknownFormat("hostname".into()))
        );
        assert_eq!("uuid".parse::<StringFormat>(), Ok(StringFormat::Uuid));
    }

    #[test]
    fn explain_messages() {
        assert_eq!(
            Constraint::MinLength(2).explain(&json!("A")),
            "length 1 is less than the minimum of 2"
        );
        assert_eq!(Constraint::Gt(num(json!(0))).explain(&json!(-1)), "-1 must be greater than 0");
    }
}
