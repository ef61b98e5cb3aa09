//! Types for the synthesis loop.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::{CandidateSelectionAudit, RunId};
use crate::constraint::{CandidateDefinition, Constraint, ConstraintSpec};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::scoring::{CandidateScore, ScoringWeights, DEFAULT_CONFIDENCE_THRESHOLD};

/// Configuration for the [`Synthesizer`](super::Synthesizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisConfig {
    /// Attempt budget per bundle (default: 5)
    pub max_attempts: u32,
    /// Selections below this are flagged as low confidence (default: 0.6)
    pub confidence_threshold: f64,
    pub weights: ScoringWeights,
    /// Where the predicate registry is persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,
    /// Where results are cached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            weights: ScoringWeights::default(),
            registry_path: None,
            cache_dir: None,
        }
    }
}

impl SynthesisConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        self.weights.validate()
    }
}

/// One bundle to synthesize a value for.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Stable bundle identity.
    pub type_text: String,
    /// Cache-validity key.
    pub fingerprint: Fingerprint,
    pub dependencies: Vec<String>,
    pub spec: ConstraintSpec,
}

impl SynthesisRequest {
    /// Build a request, fingerprinting the bundle and its dependencies.
    pub fn new(type_text: impl Into<String>, dependencies: Vec<String>, spec: ConstraintSpec) -> Self {
        let type_text = type_text.into();
        let fingerprint = Fingerprint::compute(&type_text, &dependencies);
        Self {
            type_text,
            fingerprint,
            dependencies,
            spec,
        }
    }

    /// Use a fingerprint computed elsewhere.
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = fingerprint;
        self
    }
}

/// Extra information carried into the oracle request.
#[derive(Debug, Clone, Default)]
pub struct SynthesisContext {
    /// Free text about where the value will be used.
    pub context: Option<String>,
    /// Heuristics discovered by earlier runs.
    pub previous_heuristics: Vec<CandidateDefinition>,
}

impl SynthesisContext {
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_heuristics(mut self, heuristics: Vec<CandidateDefinition>) -> Self {
        self.previous_heuristics = heuristics;
        self
    }
}

/// A validated result.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub run_id: RunId,
    pub value: Value,
    /// Heuristics accumulated over the run (or loaded from the cache).
    pub heuristics: Vec<CandidateDefinition>,
    /// The full constraint set the value was validated against.
    pub constraints: Vec<Constraint>,
    /// Ranking of the successful attempt, best first.
    pub ranked_candidates: Vec<CandidateScore>,
    pub candidate_selection_audit: Option<CandidateSelectionAudit>,
    /// Attempts used; zero on a cache hit.
    pub attempts: u32,
    pub from_cache: bool,
}

/// Orchestrator states, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisState {
    Requesting,
    Parsing,
    Scoring,
    Validating,
    Succeeded,
    Retrying,
    InfeasibleRetry,
    Exhausted,
}

impl fmt::Display for SynthesisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Requesting => "requesting",
            Self::Parsing => "parsing",
            Self::Scoring => "scoring",
            Self::Validating => "validating",
            Self::Succeeded => "succeeded",
            Self::Retrying => "retrying",
            Self::InfeasibleRetry => "infeasible-retry",
            Self::Exhausted => "exhausted",
        };
        write!(f, "{}", name)
    }
}

/// Why an attempt did not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryReason {
    /// The oracle call failed or returned nothing.
    Transport(String),
    /// The response was not well-formed.
    Parse(String),
    /// The oracle said no value exists.
    Infeasible(String),
    /// The proposed value failed these constraint descriptions.
    Validation { value: Value, errors: Vec<String> },
}

impl RetryReason {
    /// Feedback text for the next attempt's request.
    pub fn feedback(&self) -> String {
        match self {
            Self::Transport(message) => format!(
                "The oracle call failed ({}). Reply with a single JSON object that has a \"value\" field.",
                message
            ),
            Self::Parse(message) => format!(
                "Your reply could not be used ({}). Reply with only a JSON object that has a \"value\" field and well-formed heuristics.",
                message
            ),
            Self::Infeasible(explanation) => format!(
                "You reported that no value exists ({}). The examples are illustrative, not exhaustive: \
                 generalize from the constraints instead of matching the examples literally, and propose a value.",
                explanation
            ),
            Self::Validation { value, errors } => {
                let mut text = format!("The value {} failed these constraints:", value);
                for error in errors {
                    text.push_str("\n- ");
                    text.push_str(error);
                }
                text
            }
        }
    }

    /// Constraint descriptions that failed, when this was a validation failure.
    pub fn errors(&self) -> Option<Vec<String>> {
        match self {
            Self::Validation { errors, .. } => Some(errors.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> SynthesisState {
        match self {
            Self::Infeasible(_) => SynthesisState::InfeasibleRetry,
            _ => SynthesisState::Retrying,
        }
    }
}

/// Outcome of one attempt.
///
/// Exhausting the budget is the loop's only terminal outcome and surfaces as
/// [`Error::SynthesisExhausted`].
#[derive(Debug)]
pub enum Step<T> {
    Continue(T),
    Retry(RetryReason),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults_and_validation() {
        let config = SynthesisConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.confidence_threshold, 0.6);
        assert!(config.validate().is_ok());

        assert!(SynthesisConfig::default().with_max_attempts(0).validate().is_err());
        assert!(SynthesisConfig::default()
            .with_confidence_threshold(1.2)
            .validate()
            .is_err());
        assert!(SynthesisConfig::default()
            .with_weights(ScoringWeights::new(-1.0, 0.5, 0.5))
            .validate()
            .is_err());
    }

    #[test]
    fn test_request_fingerprint_follows_dependencies() {
        let a = SynthesisRequest::new("{Even}", vec!["type Even = A".into()], ConstraintSpec::new());
        let b = SynthesisRequest::new("{Even}", vec!["type Even = A".into()], ConstraintSpec::new());
        let c = SynthesisRequest::new("{Even}", vec!["type Even = B".into()], ConstraintSpec::new());
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn test_validation_feedback_names_every_error() {
        let reason = RetryReason::Validation {
            value: json!(7),
            errors: vec!["must be even".into(), "must be greater than 100".into()],
        };
        let feedback = reason.feedback();
        assert!(feedback.contains("The value 7"));
        assert!(feedback.contains("- must be even"));
        assert!(feedback.contains("- must be greater than 100"));
        assert_eq!(reason.errors().map(|e| e.len()), Some(2));
        assert_eq!(reason.state(), SynthesisState::Retrying);
    }

    #[test]
    fn test_infeasible_feedback_asks_to_generalize() {
        let reason = RetryReason::Infeasible("NO_VALUE_EXISTS".into());
        assert!(reason.feedback().contains("generalize"));
        assert_eq!(reason.errors(), None);
        assert_eq!(reason.state(), SynthesisState::InfeasibleRetry);
    }
}
