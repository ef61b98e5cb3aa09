//! Property-based tests for candidate scoring.
//!
//! - complexity stays within [0.1, 1.0] for any source
//! - total score is the weighted sum of the three dimensions
//! - coverage stays within [0, 1] once there is something to compare against
//! - ranking is sorted descending and loses no candidate

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use crate::constraint::{CandidateDefinition, Constraint, ConstraintSource};
    use crate::scoring::{CandidateScorer, ScoringWeights};

    fn source() -> impl Strategy<Value = String> {
        prop_oneof![
            "[ -~]{0,700}",
            (0i64..1000).prop_map(|n| format!("x => x > {}", n)),
            (1i64..10).prop_map(|n| format!("x => x % {} === 0", n)),
            Just("v => typeof v === 'number' && v > 0".to_string()),
        ]
    }

    fn weight() -> impl Strategy<Value = f64> {
        0.0f64..1.0f64
    }

    fn positive() -> Constraint {
        Constraint::new("positive", "must be positive", ConstraintSource::Inferred, |v| {
            v.as_f64().is_some_and(|n| n > 0.0)
        })
    }

    proptest! {
        /// Complexity is clamped to [0.1, 1.0].
        #[test]
        fn complexity_is_bounded(src in source()) {
            let scorer = CandidateScorer::default();
            let s = scorer.score(&CandidateDefinition::new("c", "", src), &[], &[]);
            prop_assert!(s.complexity_score >= 0.1 && s.complexity_score <= 1.0);
        }

        /// Total equals the weighted sum of its parts.
        #[test]
        fn total_is_weighted_sum(
            src in source(),
            wc in weight(),
            wv in weight(),
            wr in weight(),
        ) {
            let scorer = CandidateScorer::new(ScoringWeights::new(wc, wv, wr));
            let s = scorer.score(
                &CandidateDefinition::new("c", "", src),
                &[positive()],
                &[json!(1), json!(-1)],
            );
            let expected = s.complexity_score * wc + s.coverage_score * wv + s.reusability_score * wr;
            prop_assert!((s.total_score - expected).abs() < 1e-9);
        }

        /// Coverage is a normalized fraction.
        #[test]
        fn coverage_is_normalized(
            src in source(),
            samples in prop::collection::vec(-50i64..50, 1..8),
        ) {
            let scorer = CandidateScorer::default();
            let samples: Vec<_> = samples.into_iter().map(|n| json!(n)).collect();
            let s = scorer.score(&CandidateDefinition::new("c", "", src), &[positive()], &samples);
            prop_assert!(s.coverage_score >= 0.0 && s.coverage_score <= 1.0 + 1e-12);
        }

        /// Ranking keeps every candidate and orders totals descending.
        #[test]
        fn rank_is_sorted_permutation(sources in prop::collection::vec(source(), 0..6)) {
            let scorer = CandidateScorer::default();
            let candidates: Vec<_> = sources
                .iter()
                .enumerate()
                .map(|(i, s)| CandidateDefinition::new(format!("c{}", i), "", s.clone()))
                .collect();
            let ranked = scorer.rank(&candidates, &[], &[]);
            prop_assert_eq!(ranked.len(), candidates.len());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].total_score >= pair[1].total_score);
            }
        }
    }
}
