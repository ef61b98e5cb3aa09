//! Audit Log: the record of every synthesis decision.
//!
//! Three kinds of record are kept:
//!
//! - [`PredicateAudit`]: one per discovered predicate, upserted on rediscovery
//! - [`CandidateSelectionAudit`]: one per attempt that ranked candidates
//! - [`ValidationAudit`]: one per attempt
//!
//! plus a chronological [`AuditEntry`] timeline. The log is a pure in-memory
//! accumulator; callers persist it through [`AuditLog::export`].

mod log;
mod proptest;
mod types;

pub use log::{AuditLog, SharedAuditLog};
pub use types::{
    AuditEntry, AuditExport, AuditSummary, CandidateSelectionAudit, PredicateAudit, RunId,
    ValidationAudit,
};
