//! Cache entry and report types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constraint::{CandidateDefinition, ConstraintRecord};
use crate::fingerprint::Fingerprint;

/// A persisted synthesis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Bundle identity.
    pub type_text: String,
    pub fingerprint: Fingerprint,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub value: Value,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristics: Option<Vec<CandidateDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<ConstraintRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of looking a bundle up in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    /// An entry exists but its fingerprint no longer matches.
    Stale(CacheEntry),
    Miss,
}

/// Configuration for the cache manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheManagerConfig {
    /// Entries at or above this confidence are preserved.
    pub confidence_threshold: f64,
    /// Entries at or above this are counted as high-confidence preserved.
    pub high_confidence_threshold: f64,
}

impl Default for CacheManagerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            high_confidence_threshold: 0.90,
        }
    }
}

impl CacheManagerConfig {
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

/// Metadata of one cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAudit {
    pub path: PathBuf,
    /// Declared bundle identity, or `<unknown:file-stem>` when absent.
    pub type_text: String,
    pub label_derived: bool,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheAction {
    Preserve,
    Regenerate,
}

/// Decision for one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationDecision {
    pub type_text: String,
    pub path: PathBuf,
    pub action: CacheAction,
    /// Confidence of the most recent selection, if any was recorded.
    pub confidence: Option<f64>,
    pub reason: String,
}

/// Preserve/regenerate decisions over one audit pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationReport {
    pub total_entries: usize,
    pub preserve_count: usize,
    pub regenerate_count: usize,
    pub high_confidence_preserved: usize,
    /// Mean over all entries; unknown confidence counts as zero.
    pub average_confidence: f64,
    pub duration_ms: u64,
    pub generated_at: DateTime<Utc>,
    pub decisions: Vec<RegenerationDecision>,
}

/// Confidence distribution over a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealthMetrics {
    pub total: usize,
    pub excellent: usize,
    pub good: usize,
    pub acceptable: usize,
    pub poor: usize,
    pub excellent_pct: f64,
    pub good_pct: f64,
    pub acceptable_pct: f64,
    pub poor_pct: f64,
}
