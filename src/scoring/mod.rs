//! Candidate Scorer/Ranker.
//!
//! Competing candidate validators are scored on three dimensions and ranked
//! by their weighted total:
//!
//! - **complexity**: shorter predicate source is simpler (1.0 under 50 chars,
//!   0.1 over 500, linear in between)
//! - **coverage**: agreement with the current constraint set over sample values
//! - **reusability**: how generalizable the predicate's shape looks
//!
//! Confidence is a policy decision made by the caller via [`is_confident`].

mod proptest;
mod scorer;
mod types;

pub use scorer::{is_confident, CandidateScorer};
pub use types::{CandidateScore, ScoringWeights, Selection, DEFAULT_CONFIDENCE_THRESHOLD};
