//! Heuristic compilation, validation and merging of constraint sets.

use serde_json::Value;
use tracing::debug;

use super::types::{CandidateDefinition, Constraint, ConstraintSource};
use crate::predicate::{compile_predicate, predicate_id};

/// Compile an oracle-discovered definition into a heuristic constraint.
///
/// Returns `None` when the source does not compile; the definition is
/// dropped and the caller carries on without it.
pub fn compile_heuristic(definition: &CandidateDefinition) -> Option<Constraint> {
    let compiled = match compile_predicate(&definition.predicate_source) {
        Ok(compiled) => compiled,
        Err(e) => {
            debug!("Dropping heuristic '{}': {}", definition.name, e);
            return None;
        }
    };

    let description = if definition.description.trim().is_empty() {
        definition.name.clone()
    } else {
        definition.description.clone()
    };
    let id = predicate_id(&definition.predicate_source);

    Some(
        Constraint::new(
            definition.name.clone(),
            description,
            ConstraintSource::Heuristic,
            move |v| compiled.test(v),
        )
        .with_predicate(definition.predicate_source.clone(), id),
    )
}

/// Check `value` against every constraint.
///
/// On failure the error carries the description of each failing constraint,
/// in constraint order.
pub fn validate_value(constraints: &[Constraint], value: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = constraints
        .iter()
        .filter(|c| !c.check(value))
        .map(|c| c.description().to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Merge `additions` into `existing`, last writer wins by name.
///
/// A replaced constraint keeps its position; new names are appended. A
/// heuristic never supersedes an inferred constraint of the same name: the
/// inferred one stays and the heuristic is skipped.
pub fn merge(
    existing: Vec<Constraint>,
    additions: impl IntoIterator<Item = Constraint>,
) -> Vec<Constraint> {
    let mut merged = existing;
    for constraint in additions {
        match merged.iter().position(|c| c.name() == constraint.name()) {
            Some(idx)
                if merged[idx].source() == ConstraintSource::Inferred
                    && constraint.source() == ConstraintSource::Heuristic =>
            {
                debug!(
                    "Heuristic '{}' shadowed by inferred constraint '{}'",
                    constraint.name(),
                    merged[idx].description()
                );
            }
            Some(idx) => merged[idx] = constraint,
            None => merged.push(constraint),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn heuristic(name: &str, source: &str) -> Constraint {
        compile_heuristic(&CandidateDefinition::new(name, format!("{} check", name), source))
            .unwrap()
    }

    #[test]
    fn test_compile_heuristic_sets_provenance() {
        let c = heuristic("even", "x => x % 2 === 0");
        assert_eq!(c.source(), ConstraintSource::Heuristic);
        assert_eq!(c.predicate_source(), Some("x => x % 2 === 0"));
        assert_eq!(c.predicate_id(), Some(predicate_id("x => x % 2 === 0").as_str()));
        assert!(c.check(&json!(4)));
        assert!(!c.check(&json!(5)));
    }

    #[test]
    fn test_identical_source_shares_predicate_id() {
        let a = heuristic("a", "x => x > 1");
        let b = heuristic("b", "x => x > 1");
        assert_eq!(a.predicate_id(), b.predicate_id());
    }

    #[test]
    fn test_compile_failure_is_dropped() {
        let def = CandidateDefinition::new("bad", "", "x => { while (true) {} }");
        assert!(compile_heuristic(&def).is_none());
    }

    #[test]
    fn test_empty_description_falls_back_to_name() {
        let def = CandidateDefinition::new("positive", "  ", "x => x > 0");
        assert_eq!(compile_heuristic(&def).unwrap().description(), "positive");
    }

    #[test]
    fn test_validate_collects_every_failure() {
        let constraints = vec![
            heuristic("even", "x => x % 2 === 0"),
            heuristic("big", "x => x > 100"),
            heuristic("number", "x => typeof x === 'number'"),
        ];
        assert!(validate_value(&constraints, &json!(102)).is_ok());
        assert_eq!(
            validate_value(&constraints, &json!(7)).unwrap_err(),
            vec!["even check".to_string(), "big check".to_string()]
        );
        assert_eq!(validate_value(&constraints, &json!("x")).unwrap_err().len(), 3);
        assert!(validate_value(&[], &json!(null)).is_ok());
    }

    #[test]
    fn test_merge_keeps_inferred_over_same_named_heuristic() {
        let inferred = vec![Constraint::new(
            "even",
            "must be even",
            ConstraintSource::Inferred,
            |v| v.as_i64().is_some_and(|n| n % 2 == 0),
        )];
        let merged = merge(inferred, vec![heuristic("even", "x => x % 2 === 1")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source(), ConstraintSource::Inferred);
        assert_eq!(merged[0].predicate_source(), None);
        assert_eq!(
            validate_value(&merged, &json!(7)),
            Err(vec!["must be even".to_string()])
        );

        // Inferred still replaces a heuristic of the same name.
        let merged = merge(
            vec![heuristic("big", "x => x > 1")],
            vec![Constraint::new("big", "must be big", ConstraintSource::Inferred, |_| false)],
        );
        assert_eq!(merged[0].source(), ConstraintSource::Inferred);
    }

    #[test]
    fn test_merge_last_writer_wins_by_name() {
        let existing = vec![heuristic("a", "x => x > 0"), heuristic("b", "x => x < 10")];
        let merged = merge(
            existing,
            vec![heuristic("a", "x => x > 5"), heuristic("c", "x => x !== 7")],
        );
        let names: Vec<_> = merged.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(merged[0].predicate_source(), Some("x => x > 5"));
        assert!(!merged[0].check(&json!(3)));
    }
}
