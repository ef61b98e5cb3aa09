//! # constraint-synth
//!
//! Constraint-driven value synthesis with a generative oracle and a
//! confidence-audited result cache.
//!
//! ## Core Components
//!
//! - **Predicate**: Sandboxed compilation of oracle-proposed validators and the persistent registry
//! - **Constraint**: Derivation from component specs, heuristic compilation and validation
//! - **Scoring**: Candidate validator ranking by complexity, coverage and reusability
//! - **Audit**: Append-only record of discoveries, selections and validations
//! - **Synthesis**: The propose-validate-retry loop driving an [`Oracle`]
//! - **Cache**: Fingerprinted result storage and confidence-based regeneration reports
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use constraint_synth::{
//!     AuditLog, ComponentSpec, ConstraintSpec, HttpOracle, OracleProvider, SynthesisConfig,
//!     SynthesisContext, SynthesisRequest, Synthesizer, TransportConfig,
//! };
//!
//! let oracle = HttpOracle::new(TransportConfig::new(OracleProvider::Anthropic, api_key))?;
//! let audit = AuditLog::new().into_shared();
//! let synth = Synthesizer::from_config(
//!     Arc::new(oracle),
//!     audit.clone(),
//!     SynthesisConfig::default().with_cache_dir("~/.cache/constraint-synth"),
//! )?;
//!
//! let request = SynthesisRequest::new(
//!     "{Even}",
//!     vec![],
//!     ConstraintSpec::new().with_component(ComponentSpec::new("Even")),
//! );
//! let outcome = synth.synthesize(&request, &SynthesisContext::default()).await?;
//!
//! let report = constraint_synth::audit_and_report("~/.cache/constraint-synth", audit).await?;
//! println!("{} of {} entries need regeneration", report.regenerate_count, report.total_entries);
//! ```

pub mod audit;
pub mod cache;
pub mod constraint;
pub mod error;
pub mod fingerprint;
pub mod oracle;
pub mod predicate;
pub mod scoring;
pub mod synthesis;

// Re-exports for convenience
pub use audit::{
    AuditEntry, AuditExport, AuditLog, AuditSummary, CandidateSelectionAudit, PredicateAudit,
    RunId, SharedAuditLog, ValidationAudit,
};
pub use cache::{
    audit_and_report, CacheAction, CacheAudit, CacheEntry, CacheHealthMetrics, CacheLookup,
    CacheManager, CacheManagerConfig, CacheStore, RegenerationDecision, RegenerationReport,
};
pub use constraint::{
    compile_heuristic, derive_from_component, merge, validate_value, CandidateDefinition,
    ComponentSpec, Constraint, ConstraintRecord, ConstraintSource, ConstraintSpec, Requirement,
};
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use oracle::{
    parse_response, HttpOracle, Oracle, OracleProposal, OracleProvider, OracleReply,
    OracleRequest, PromptBuilder, TransportConfig,
};
pub use predicate::{
    compile_predicate, predicate_id, CompiledPredicate, PredicateError, PredicateRegistry,
    PredicateRegistryEntry, SharedPredicateRegistry,
};
pub use scoring::{
    is_confident, CandidateScore, CandidateScorer, ScoringWeights, Selection,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use synthesis::{
    SynthesisConfig, SynthesisContext, SynthesisOutcome, SynthesisRequest, SynthesisState,
    Synthesizer,
};
