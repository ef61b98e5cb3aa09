//! Audit record types.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::scoring::CandidateScore;

/// Identifier of one synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> std::result::Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discovery history of one predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateAudit {
    pub predicate_id: String,
    pub name: String,
    pub discovered_at: DateTime<Utc>,
    /// Bundle identity the predicate was first discovered for.
    pub discovered_from: String,
    /// Highest confidence ever observed.
    pub confidence: f64,
    pub usage_count: u64,
    pub last_used_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Ranking outcome of one synthesis attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSelectionAudit {
    pub run_id: RunId,
    pub type_text: String,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    /// Full ranked list, best first.
    pub candidates: Vec<CandidateScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_score: Option<f64>,
    pub confidence: f64,
    pub selection_reason: String,
}

impl CandidateSelectionAudit {
    /// Build from a ranked list; the head of the list is the selection.
    pub fn from_ranking(
        run_id: RunId,
        type_text: impl Into<String>,
        attempt: u32,
        ranked: Vec<CandidateScore>,
        selection_reason: impl Into<String>,
    ) -> Self {
        let best = ranked.first();
        let selected_name = best.map(|s| s.candidate.name.clone());
        let selected_score = best.map(|s| s.total_score);
        Self {
            run_id,
            type_text: type_text.into(),
            attempt,
            timestamp: Utc::now(),
            selected_index: best.map(|_| 0),
            selected_name,
            selected_score,
            confidence: selected_score.unwrap_or(0.0),
            candidates: ranked,
            selection_reason: selection_reason.into(),
        }
    }
}

/// Validation outcome of one synthesis attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationAudit {
    pub run_id: RunId,
    pub type_text: String,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ValidationAudit {
    pub fn passed(run_id: RunId, type_text: impl Into<String>, attempt: u32) -> Self {
        Self {
            run_id,
            type_text: type_text.into(),
            attempt,
            timestamp: Utc::now(),
            valid: true,
            errors: None,
            feedback: None,
        }
    }

    pub fn failed(
        run_id: RunId,
        type_text: impl Into<String>,
        attempt: u32,
        errors: Option<Vec<String>>,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            type_text: type_text.into(),
            attempt,
            timestamp: Utc::now(),
            valid: false,
            errors,
            feedback: Some(feedback.into()),
        }
    }
}

/// One line of the chronological audit timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEntry {
    PredicateDiscovered {
        #[serde(rename = "predicateId")]
        predicate_id: String,
        #[serde(rename = "typeText")]
        type_text: String,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },
    CandidateSelection {
        #[serde(rename = "typeText")]
        type_text: String,
        attempt: u32,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },
    Validation {
        #[serde(rename = "typeText")]
        type_text: String,
        attempt: u32,
        valid: bool,
        timestamp: DateTime<Utc>,
    },
}

/// Aggregate view over an audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total_predicates: usize,
    pub total_selections: usize,
    pub total_validations: usize,
    pub passed_validations: usize,
    pub failed_validations: usize,
    pub success_rate: f64,
    pub average_selection_confidence: f64,
}

/// Order-preserving serialization of every record kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditExport {
    pub entries: Vec<AuditEntry>,
    pub predicate_audits: Vec<PredicateAudit>,
    pub candidate_audits: BTreeMap<String, Vec<CandidateSelectionAudit>>,
    pub validation_audits: BTreeMap<String, Vec<ValidationAudit>>,
}

impl AuditExport {
    /// Write as pretty JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
