//! Multi-dimensional scoring and ranking of candidate validators.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::types::{CandidateScore, ScoringWeights, Selection};
use crate::constraint::{CandidateDefinition, Constraint};
use crate::error::{Error, Result};
use crate::predicate::compile_predicate;

/// Sources shorter than this are maximally simple.
const SIMPLE_LEN: usize = 50;
/// Sources longer than this get the floor complexity score.
const COMPLEX_LEN: usize = 500;
const MIN_COMPLEXITY: f64 = 0.1;
/// Predicates this long are considered too specific to reuse.
const LONG_PREDICATE_LEN: usize = 300;

static TYPE_CHECK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"typeof\s|Array\.isArray\s*\(|Number\.isInteger\s*\(").expect("Invalid regex")
});

static MODULO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\s*\d+(?:\.\d+)?\s*(?:===|!==|==|!=)\s*\d+").expect("Invalid regex")
});

/// `x => x > 10`, `(n) => n <= -3.5`
static SIMPLE_COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\(?\s*([A-Za-z_$][\w$]*)\s*\)?\s*=>\s*([A-Za-z_$][\w$]*)\s*(?:<=|>=|<|>|===|!==|==|!=)\s*-?\d+(?:\.\d+)?\s*;?\s*$",
    )
    .expect("Invalid regex")
});

/// Pure confidence policy check.
pub fn is_confident(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Scores candidate validators by complexity, coverage and reusability.
#[derive(Debug, Clone, Default)]
pub struct CandidateScorer {
    weights: ScoringWeights,
}

impl CandidateScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a single candidate.
    pub fn score(
        &self,
        candidate: &CandidateDefinition,
        constraints: &[Constraint],
        samples: &[Value],
    ) -> CandidateScore {
        let mut reasoning = Vec::new();
        let complexity_score = complexity(&candidate.predicate_source, &mut reasoning);
        let coverage_score = coverage(&candidate.predicate_source, constraints, samples, &mut reasoning);
        let reusability_score = reusability(&candidate.predicate_source, &mut reasoning);

        let total_score = complexity_score * self.weights.complexity
            + coverage_score * self.weights.coverage
            + reusability_score * self.weights.reusability;

        CandidateScore {
            candidate: candidate.clone(),
            complexity_score,
            coverage_score,
            reusability_score,
            total_score,
            reasoning,
        }
    }

    /// Score and sort descending by total. Ties keep their input order.
    pub fn rank(
        &self,
        candidates: &[CandidateDefinition],
        constraints: &[Constraint],
        samples: &[Value],
    ) -> Vec<CandidateScore> {
        let mut scores: Vec<CandidateScore> = candidates
            .iter()
            .map(|c| self.score(c, constraints, samples))
            .collect();
        scores.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(Ordering::Equal)
        });
        scores
    }

    /// Rank and split into the winner and its alternatives.
    pub fn select_best(
        &self,
        candidates: &[CandidateDefinition],
        constraints: &[Constraint],
        samples: &[Value],
    ) -> Result<Selection> {
        let mut ranked = self.rank(candidates, constraints, samples).into_iter();
        let best = ranked.next().ok_or(Error::EmptyCandidateSet)?;
        Ok(Selection {
            best,
            alternatives: ranked.collect(),
        })
    }
}

fn complexity(source: &str, reasoning: &mut Vec<String>) -> f64 {
    let len = source.chars().count();
    let score = if len < SIMPLE_LEN {
        1.0
    } else if len > COMPLEX_LEN {
        MIN_COMPLEXITY
    } else {
        let span = (COMPLEX_LEN - SIMPLE_LEN) as f64;
        1.0 - (len - SIMPLE_LEN) as f64 / span * (1.0 - MIN_COMPLEXITY)
    };
    reasoning.push(format!("complexity {:.2} ({} chars)", score, len));
    score
}

fn coverage(
    source: &str,
    constraints: &[Constraint],
    samples: &[Value],
    reasoning: &mut Vec<String>,
) -> f64 {
    if constraints.is_empty() || samples.is_empty() {
        reasoning.push("coverage 0.50 (nothing to compare against)".to_string());
        return 0.5;
    }
    let compiled = match compile_predicate(source) {
        Ok(p) => p,
        Err(e) => {
            reasoning.push(format!("coverage 0.10 (does not compile: {})", e));
            return 0.1;
        }
    };

    // Agreement and independent passes are counted additively.
    let mut points = 0.0;
    for sample in samples {
        let passes = compiled.test(sample);
        for constraint in constraints {
            if passes == constraint.check(sample) {
                points += 1.0;
            }
            if passes {
                points += 0.5;
            }
        }
    }
    let score = points / (constraints.len() * samples.len()) as f64 / 1.5;
    reasoning.push(format!(
        "coverage {:.2} over {} constraints x {} samples",
        score,
        constraints.len(),
        samples.len()
    ));
    score
}

fn reusability(source: &str, reasoning: &mut Vec<String>) -> f64 {
    let (score, why) = if source.chars().count() > LONG_PREDICATE_LEN {
        (0.3, "too long to reuse")
    } else if source.contains("&&") || source.contains("||") {
        (0.5, "boolean combination")
    } else if TYPE_CHECK_RE.is_match(source) {
        (0.85, "type check")
    } else if MODULO_RE.is_match(source) {
        (0.9, "modulo pattern")
    } else if is_simple_comparison(source) {
        (0.8, "single-variable comparison")
    } else {
        (0.5, "unrecognized shape")
    };
    reasoning.push(format!("reusability {:.2} ({})", score, why));
    score
}

fn is_simple_comparison(source: &str) -> bool {
    SIMPLE_COMPARISON_RE
        .captures(source)
        .is_some_and(|c| c.get(1).map(|m| m.as_str()) == c.get(2).map(|m| m.as_str()))
}
