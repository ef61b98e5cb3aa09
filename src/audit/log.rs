//! In-memory audit accumulator.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{
    AuditEntry, AuditExport, AuditSummary, CandidateSelectionAudit, PredicateAudit,
    ValidationAudit,
};

/// Audit log shared between the orchestrator and the cache manager.
pub type SharedAuditLog = Arc<RwLock<AuditLog>>;

/// Append-only record of discovery, selection and validation decisions.
///
/// Selection and validation records are keyed by bundle identity. Predicate
/// records are upserted: rediscovery bumps the usage count and keeps the
/// highest confidence seen.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    predicate_audits: Vec<PredicateAudit>,
    predicate_index: HashMap<String, usize>,
    candidate_audits: BTreeMap<String, Vec<CandidateSelectionAudit>>,
    validation_audits: BTreeMap<String, Vec<ValidationAudit>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap for sharing across tasks.
    pub fn into_shared(self) -> SharedAuditLog {
        Arc::new(RwLock::new(self))
    }

    /// Record that a predicate was discovered (or rediscovered) for a bundle.
    pub fn record_predicate_discovery(
        &mut self,
        predicate_id: &str,
        name: &str,
        type_text: &str,
        confidence: f64,
        context: Option<String>,
    ) {
        let now = Utc::now();
        match self.predicate_index.get(predicate_id) {
            Some(&idx) => {
                let audit = &mut self.predicate_audits[idx];
                audit.usage_count += 1;
                audit.confidence = audit.confidence.max(confidence);
                audit.last_used_at = now;
                debug!(
                    "Predicate {} rediscovered (uses={}, confidence={:.2})",
                    predicate_id, audit.usage_count, audit.confidence
                );
            }
            None => {
                self.predicate_index
                    .insert(predicate_id.to_string(), self.predicate_audits.len());
                self.predicate_audits.push(PredicateAudit {
                    predicate_id: predicate_id.to_string(),
                    name: name.to_string(),
                    discovered_at: now,
                    discovered_from: type_text.to_string(),
                    confidence,
                    usage_count: 1,
                    last_used_at: now,
                    context,
                });
            }
        }
        self.entries.push(AuditEntry::PredicateDiscovered {
            predicate_id: predicate_id.to_string(),
            type_text: type_text.to_string(),
            confidence,
            timestamp: now,
        });
    }

    pub fn record_candidate_selection(&mut self, audit: CandidateSelectionAudit) {
        self.entries.push(AuditEntry::CandidateSelection {
            type_text: audit.type_text.clone(),
            attempt: audit.attempt,
            confidence: audit.confidence,
            timestamp: audit.timestamp,
        });
        self.candidate_audits
            .entry(audit.type_text.clone())
            .or_default()
            .push(audit);
    }

    pub fn record_validation(&mut self, audit: ValidationAudit) {
        self.entries.push(AuditEntry::Validation {
            type_text: audit.type_text.clone(),
            attempt: audit.attempt,
            valid: audit.valid,
            timestamp: audit.timestamp,
        });
        self.validation_audits
            .entry(audit.type_text.clone())
            .or_default()
            .push(audit);
    }

    pub fn predicate_audit(&self, predicate_id: &str) -> Option<&PredicateAudit> {
        self.predicate_index
            .get(predicate_id)
            .map(|&idx| &self.predicate_audits[idx])
    }

    pub fn predicate_audits(&self) -> &[PredicateAudit] {
        &self.predicate_audits
    }

    pub fn candidate_selections(&self, type_text: &str) -> &[CandidateSelectionAudit] {
        self.candidate_audits
            .get(type_text)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Most recent selection recorded for a bundle.
    pub fn latest_candidate_selection(&self, type_text: &str) -> Option<&CandidateSelectionAudit> {
        self.candidate_selections(type_text).last()
    }

    pub fn validations(&self, type_text: &str) -> &[ValidationAudit] {
        self.validation_audits
            .get(type_text)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Chronological timeline of every record.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn summary(&self) -> AuditSummary {
        let validations: Vec<&ValidationAudit> = self.validation_audits.values().flatten().collect();
        let passed = validations.iter().filter(|v| v.valid).count();
        let total = validations.len();

        let selections: Vec<f64> = self
            .candidate_audits
            .values()
            .flatten()
            .map(|s| s.confidence)
            .collect();

        AuditSummary {
            total_predicates: self.predicate_audits.len(),
            total_selections: selections.len(),
            total_validations: total,
            passed_validations: passed,
            failed_validations: total - passed,
            success_rate: ratio(passed as f64, total),
            average_selection_confidence: ratio(selections.iter().sum(), selections.len()),
        }
    }

    pub fn export(&self) -> AuditExport {
        AuditExport {
            entries: self.entries.clone(),
            predicate_audits: self.predicate_audits.clone(),
            candidate_audits: self.candidate_audits.clone(),
            validation_audits: self.validation_audits.clone(),
        }
    }

    /// Rebuild a log from a previous export.
    pub fn from_export(export: AuditExport) -> Self {
        let predicate_index = export
            .predicate_audits
            .iter()
            .enumerate()
            .map(|(idx, a)| (a.predicate_id.clone(), idx))
            .collect();
        Self {
            entries: export.entries,
            predicate_audits: export.predicate_audits,
            predicate_index,
            candidate_audits: export.candidate_audits,
            validation_audits: export.validation_audits,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.predicate_audits.clear();
        self.predicate_index.clear();
        self.candidate_audits.clear();
        self.validation_audits.clear();
    }
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}
