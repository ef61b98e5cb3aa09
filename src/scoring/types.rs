//! Types for candidate scoring.

use serde::{Deserialize, Serialize};

use crate::constraint::CandidateDefinition;
use crate::error::{Error, Result};

/// Default threshold for [`is_confident`](super::is_confident).
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Relative weights of the three scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub complexity: f64,
    pub coverage: f64,
    pub reusability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            complexity: 0.3,
            coverage: 0.4,
            reusability: 0.3,
        }
    }
}

impl ScoringWeights {
    pub fn new(complexity: f64, coverage: f64, reusability: f64) -> Self {
        Self {
            complexity,
            coverage,
            reusability,
        }
    }

    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("complexity", self.complexity),
            ("coverage", self.coverage),
            ("reusability", self.reusability),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::Config(format!(
                    "scoring weight '{}' must be a non-negative number, got {}",
                    name, w
                )));
            }
        }
        Ok(())
    }
}

/// Score of one candidate validator in one ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub candidate: CandidateDefinition,
    pub complexity_score: f64,
    pub coverage_score: f64,
    pub reusability_score: f64,
    pub total_score: f64,
    pub reasoning: Vec<String>,
}

/// Outcome of [`CandidateScorer::select_best`](super::CandidateScorer::select_best).
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub best: CandidateScore,
    /// Remaining candidates, still in ranked order.
    pub alternatives: Vec<CandidateScore>,
}
