//! Synthesis orchestration.
//!
//! For each bundle the [`Synthesizer`] derives constraints, checks the cache,
//! then loops: ask the oracle, parse, rank the proposed validators, fold
//! compiled heuristics into the constraint set and validate the value. Every
//! attempt leaves exactly one validation record in the audit log, and a
//! rejected attempt's reasons become the next request's feedback.
//!
//! ## Example
//!
//! ```rust,ignore
//! use constraint_synth::{AuditLog, SynthesisConfig, SynthesisContext, SynthesisRequest, Synthesizer};
//!
//! let synth = Synthesizer::from_config(oracle, AuditLog::new().into_shared(), SynthesisConfig::default())?;
//! let outcome = synth.synthesize(&request, &SynthesisContext::default()).await?;
//! println!("{} after {} attempt(s)", outcome.value, outcome.attempts);
//! ```

mod engine;
mod types;

pub use engine::Synthesizer;
pub use types::{
    RetryReason, Step, SynthesisConfig, SynthesisContext, SynthesisOutcome, SynthesisRequest,
    SynthesisState,
};
