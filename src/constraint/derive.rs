//! Oracle-free derivation of constraints from a bundle description.
//!
//! Pure pattern matching over component names, numeric bounds and the shape
//! of the example values. Nothing here touches the network.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::types::{ComponentSpec, Constraint, ConstraintSource, ConstraintSpec};
use super::validate::merge;

static GREATER_THAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:GreaterThan|Exceeds)").expect("Invalid regex"));
static AT_LEAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Min|AtLeast)").expect("Invalid regex"));
static LESS_THAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:LessThan|Below)").expect("Invalid regex"));
static AT_MOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Max|AtMost)").expect("Invalid regex"));
static MULTIPLE_OF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:MultipleOf|DivisibleBy)").expect("Invalid regex"));
static BETWEEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Between|Range)").expect("Invalid regex"));

/// Trailing number embedded in a component name, e.g. `GreaterThan100`.
static TRAILING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)$").expect("Invalid regex"));

/// Derive the inferred constraints of a bundle.
///
/// Hard requirements come first, then component patterns, numeric bounds and
/// finally the observed example shape. Duplicate names collapse with the
/// later derivation winning, so `GreaterThanX(100)` and `minimum = 100`
/// yield a single constraint.
pub fn derive_from_component(spec: &ConstraintSpec) -> Vec<Constraint> {
    let mut derived = Vec::new();

    for (idx, requirement) in spec.must.iter().enumerate() {
        derived.push(Constraint::from_test(
            format!("must_{}", idx),
            requirement.description.clone(),
            ConstraintSource::Inferred,
            requirement.test.clone(),
        ));
    }

    for component in &spec.components {
        derived.extend(from_component(component));
    }

    if let Some(min) = spec.minimum {
        derived.push(greater_than(min));
    }
    if let Some(max) = spec.maximum {
        derived.push(less_than(max));
    }

    derived.extend(from_examples(&spec.examples));

    merge(Vec::new(), derived)
}

fn from_component(component: &ComponentSpec) -> Vec<Constraint> {
    let name = component.name.as_str();
    let fixed = match name {
        "Even" => Some(Constraint::new("even", "must be even", ConstraintSource::Inferred, |v| {
            as_integer(v).is_some_and(|n| n % 2.0 == 0.0)
        })),
        "Odd" => Some(Constraint::new("odd", "must be odd", ConstraintSource::Inferred, |v| {
            as_integer(v).is_some_and(|n| n % 2.0 != 0.0)
        })),
        "Positive" => Some(Constraint::new(
            "positive",
            "must be positive",
            ConstraintSource::Inferred,
            |v| as_number(v).is_some_and(|n| n > 0.0),
        )),
        "Negative" => Some(Constraint::new(
            "negative",
            "must be negative",
            ConstraintSource::Inferred,
            |v| as_number(v).is_some_and(|n| n < 0.0),
        )),
        "NonNegative" => Some(Constraint::new(
            "non_negative",
            "must be non-negative",
            ConstraintSource::Inferred,
            |v| as_number(v).is_some_and(|n| n >= 0.0),
        )),
        "Integer" | "Int" => Some(integer()),
        "NonEmpty" => Some(Constraint::new(
            "non_empty",
            "must be non-empty",
            ConstraintSource::Inferred,
            |v| match v {
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                _ => false,
            },
        )),
        "Prime" => Some(Constraint::new("prime", "must be prime", ConstraintSource::Inferred, |v| {
            as_integer(v).is_some_and(is_prime)
        })),
        _ => None,
    };
    if let Some(constraint) = fixed {
        return vec![constraint];
    }

    let arg = |idx: usize| {
        component
            .numeric_argument(idx)
            .or_else(|| if idx == 0 { trailing_number(name) } else { None })
    };

    if GREATER_THAN_RE.is_match(name) {
        arg(0).map(greater_than).into_iter().collect()
    } else if AT_LEAST_RE.is_match(name) {
        arg(0).map(at_least).into_iter().collect()
    } else if LESS_THAN_RE.is_match(name) {
        arg(0).map(less_than).into_iter().collect()
    } else if AT_MOST_RE.is_match(name) {
        arg(0).map(at_most).into_iter().collect()
    } else if MULTIPLE_OF_RE.is_match(name) {
        arg(0).and_then(multiple_of).into_iter().collect()
    } else if BETWEEN_RE.is_match(name) {
        match (component.numeric_argument(0), component.numeric_argument(1)) {
            (Some(lo), Some(hi)) => vec![at_least(lo.min(hi)), at_most(lo.max(hi))],
            _ => Vec::new(),
        }
    } else {
        Vec::new()
    }
}

fn from_examples(examples: &[Value]) -> Vec<Constraint> {
    let Some(first) = examples.first() else {
        return Vec::new();
    };
    let kind = json_kind(first);
    if kind == "null" || examples.iter().any(|e| json_kind(e) != kind) {
        return Vec::new();
    }

    let mut out = vec![Constraint::new(
        "shape_kind",
        format!("must be {} {}", article(kind), kind),
        ConstraintSource::Inferred,
        move |v| json_kind(v) == kind,
    )];

    if kind == "number" && examples.iter().all(|e| as_integer(e).is_some()) {
        out.push(integer());
    }

    if kind == "object" {
        let mut shared: Option<BTreeSet<String>> = None;
        for example in examples {
            if let Value::Object(map) = example {
                let keys: BTreeSet<String> = map.keys().cloned().collect();
                shared = Some(match shared {
                    Some(acc) => acc.intersection(&keys).cloned().collect(),
                    None => keys,
                });
            }
        }
        if let Some(keys) = shared.filter(|k| !k.is_empty()) {
            let listed = keys.iter().cloned().collect::<Vec<_>>().join(", ");
            out.push(Constraint::new(
                "shape_keys",
                format!("must have keys {}", listed),
                ConstraintSource::Inferred,
                move |v| match v {
                    Value::Object(map) => keys.iter().all(|k| map.contains_key(k)),
                    _ => false,
                },
            ));
        }
    }

    out
}

fn integer() -> Constraint {
    Constraint::new(
        "integer",
        "must be an integer",
        ConstraintSource::Inferred,
        |v| as_integer(v).is_some(),
    )
}

fn greater_than(n: f64) -> Constraint {
    Constraint::new(
        format!("greater_than_{}", format_number(n)),
        format!("must be greater than {}", format_number(n)),
        ConstraintSource::Inferred,
        move |v| as_number(v).is_some_and(|x| x > n),
    )
}

fn at_least(n: f64) -> Constraint {
    Constraint::new(
        format!("at_least_{}", format_number(n)),
        format!("must be at least {}", format_number(n)),
        ConstraintSource::Inferred,
        move |v| as_number(v).is_some_and(|x| x >= n),
    )
}

fn less_than(n: f64) -> Constraint {
    Constraint::new(
        format!("less_than_{}", format_number(n)),
        format!("must be less than {}", format_number(n)),
        ConstraintSource::Inferred,
        move |v| as_number(v).is_some_and(|x| x < n),
    )
}

fn at_most(n: f64) -> Constraint {
    Constraint::new(
        format!("at_most_{}", format_number(n)),
        format!("must be at most {}", format_number(n)),
        ConstraintSource::Inferred,
        move |v| as_number(v).is_some_and(|x| x <= n),
    )
}

fn multiple_of(n: f64) -> Option<Constraint> {
    if n == 0.0 || !n.is_finite() {
        return None;
    }
    Some(Constraint::new(
        format!("multiple_of_{}", format_number(n)),
        format!("must be a multiple of {}", format_number(n)),
        ConstraintSource::Inferred,
        move |v| as_number(v).is_some_and(|x| x % n == 0.0),
    ))
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn as_integer(value: &Value) -> Option<f64> {
    as_number(value).filter(|n| n.fract() == 0.0)
}

fn is_prime(n: f64) -> bool {
    if n < 2.0 || n > u64::MAX as f64 {
        return false;
    }
    let n = n as u64;
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

fn trailing_number(name: &str) -> Option<f64> {
    TRAILING_NUMBER_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn article(kind: &str) -> &'static str {
    match kind.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{validate_value, Requirement};
    use serde_json::json;

    fn descriptions(constraints: &[Constraint]) -> Vec<String> {
        constraints.iter().map(|c| c.description().to_string()).collect()
    }

    #[test]
    fn test_even_bundle_derives_must_be_even() {
        let spec = ConstraintSpec::new()
            .with_component(ComponentSpec::new("Even"))
            .with_examples([json!(2), json!(4), json!(6), json!(8), json!(10)]);
        let derived = derive_from_component(&spec);
        assert!(descriptions(&derived).contains(&"must be even".to_string()));
        assert!(derived.iter().all(|c| c.source() == ConstraintSource::Inferred));

        assert!(validate_value(&derived, &json!(12)).is_ok());
        assert!(validate_value(&derived, &json!(7)).is_err());
    }

    #[test]
    fn test_mystery_bundle_requires_even_integer_above_100() {
        let spec = ConstraintSpec::new()
            .with_component(ComponentSpec::new("MysteryType"))
            .with_component(ComponentSpec::new("GreaterThanX").with_argument(100))
            .with_component(ComponentSpec::new("Even"))
            .with_examples([1, 2, 3, 5, 8, 13].map(|n| json!(n)))
            .with_minimum(100.0);
        let derived = derive_from_component(&spec);
        let descs = descriptions(&derived);

        assert!(descs.contains(&"must be even".to_string()));
        assert!(descs.contains(&"must be an integer".to_string()));
        assert!(descs.contains(&"must be greater than 100".to_string()));
        assert_eq!(
            descs.iter().filter(|d| *d == "must be greater than 100").count(),
            1
        );

        assert!(validate_value(&derived, &json!(102)).is_ok());
        let errors = validate_value(&derived, &json!(99)).unwrap_err();
        assert!(errors.contains(&"must be even".to_string()));
        assert!(errors.contains(&"must be greater than 100".to_string()));
        assert!(validate_value(&derived, &json!(101.5)).is_err());
    }

    #[test]
    fn test_unknown_component_derives_nothing() {
        let spec = ConstraintSpec::new().with_component(ComponentSpec::new("MysteryType"));
        assert!(derive_from_component(&spec).is_empty());
    }

    #[test]
    fn test_numeric_patterns() {
        let spec = ConstraintSpec::new()
            .with_component(ComponentSpec::new("AtLeast5"))
            .with_component(ComponentSpec::new("Below").with_argument(10))
            .with_component(ComponentSpec::new("MultipleOf").with_argument(3));
        let derived = derive_from_component(&spec);
        assert_eq!(derived.len(), 3);
        assert!(validate_value(&derived, &json!(6)).is_ok());
        assert!(validate_value(&derived, &json!(9)).is_ok());
        assert_eq!(validate_value(&derived, &json!(12)).unwrap_err().len(), 1);
        assert_eq!(validate_value(&derived, &json!(4)).unwrap_err().len(), 2);
    }

    #[test]
    fn test_between_and_prime() {
        let spec = ConstraintSpec::new()
            .with_component(ComponentSpec::new("Between").with_argument(20).with_argument(10))
            .with_component(ComponentSpec::new("Prime"));
        let derived = derive_from_component(&spec);
        assert!(validate_value(&derived, &json!(13)).is_ok());
        assert!(validate_value(&derived, &json!(15)).is_err());
        assert!(validate_value(&derived, &json!(23)).is_err());
    }

    #[test]
    fn test_object_examples_share_keys() {
        let spec = ConstraintSpec::new().with_examples([
            json!({"id": 1, "name": "a"}),
            json!({"id": 2, "name": "b", "extra": true}),
        ]);
        let derived = derive_from_component(&spec);
        assert!(descriptions(&derived).contains(&"must have keys id, name".to_string()));
        assert!(validate_value(&derived, &json!({"id": 3, "name": "c"})).is_ok());
        assert!(validate_value(&derived, &json!({"id": 3})).is_err());
    }

    #[test]
    fn test_mixed_examples_give_no_shape() {
        let spec = ConstraintSpec::new().with_examples([json!(1), json!("one")]);
        assert!(derive_from_component(&spec).is_empty());
    }

    #[test]
    fn test_must_requirements_become_inferred_constraints() {
        let spec = ConstraintSpec::new()
            .with_must(Requirement::new("must be short", |v| {
                v.as_str().is_some_and(|s| s.len() < 4)
            }))
            .with_suggested(Requirement::new("should be lowercase", |_| false));
        let derived = derive_from_component(&spec);
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].name(), "must_0");
        assert!(validate_value(&derived, &json!("abc")).is_ok());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }
}
