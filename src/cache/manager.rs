//! Audit-driven cache preservation policy.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::types::{
    CacheAction, CacheAudit, CacheHealthMetrics, CacheManagerConfig, RegenerationDecision,
    RegenerationReport,
};
use crate::audit::SharedAuditLog;
use crate::error::Result;
use crate::predicate::expand_path;

const EXCELLENT: f64 = 0.95;
const GOOD: f64 = 0.85;
const ACCEPTABLE: f64 = 0.75;

/// Decides which cached results can be reused and which must be resynthesized.
pub struct CacheManager {
    audit: SharedAuditLog,
    config: CacheManagerConfig,
}

impl CacheManager {
    pub fn new(audit: SharedAuditLog) -> Self {
        Self::with_config(audit, CacheManagerConfig::default())
    }

    pub fn with_config(audit: SharedAuditLog, config: CacheManagerConfig) -> Self {
        Self { audit, config }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.config.confidence_threshold
    }

    /// Change the preservation threshold.
    ///
    /// Values outside `[0, 1]` are rejected with a warning and the previous
    /// threshold stays in effect. Returns whether the change was applied.
    pub fn set_confidence_threshold(&mut self, threshold: f64) -> bool {
        if !(0.0..=1.0).contains(&threshold) {
            warn!(
                "Rejected confidence threshold {}: must be within [0, 1], keeping {}",
                threshold, self.config.confidence_threshold
            );
            return false;
        }
        self.config.confidence_threshold = threshold;
        true
    }

    /// Scan a cache directory for entries.
    ///
    /// A directory that does not exist yields no audits.
    pub async fn audit_cache_entries(&self, cache_dir: impl AsRef<Path>) -> Result<Vec<CacheAudit>> {
        let dir = expand_path(cache_dir.as_ref());
        if !dir.is_dir() {
            debug!("Cache directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let pattern = format!("{}/*.json", glob::Pattern::escape(&dir.to_string_lossy()));

        let mut paths: Vec<_> = match glob::glob(&pattern) {
            Ok(entries) => entries.flatten().collect(),
            Err(e) => {
                warn!("Invalid cache scan pattern {}: {}", pattern, e);
                Vec::new()
            }
        };
        paths.sort();

        let mut audits = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(audit) = audit_entry(path).await {
                audits.push(audit);
            }
        }
        Ok(audits)
    }

    /// Classify each audited entry as preserve or regenerate.
    #[instrument(skip(self, audits), fields(entries = audits.len()))]
    pub async fn generate_regeneration_report(&self, audits: &[CacheAudit]) -> RegenerationReport {
        let started = Instant::now();
        let log = self.audit.read().await;

        let mut decisions = Vec::with_capacity(audits.len());
        let mut preserve_count = 0;
        let mut high_confidence_preserved = 0;
        let mut confidence_sum = 0.0;

        for audit in audits {
            let confidence = log
                .latest_candidate_selection(&audit.type_text)
                .map(|s| s.confidence);

            let (action, reason) = match confidence {
                None => (CacheAction::Regenerate, "no selection audit recorded".to_string()),
                Some(c) if c >= self.config.high_confidence_threshold => {
                    high_confidence_preserved += 1;
                    (CacheAction::Preserve, format!("high confidence {:.2}", c))
                }
                Some(c) if c >= self.config.confidence_threshold => (
                    CacheAction::Preserve,
                    format!(
                        "confidence {:.2} meets threshold {:.2}",
                        c, self.config.confidence_threshold
                    ),
                ),
                Some(c) => (
                    CacheAction::Regenerate,
                    format!(
                        "confidence {:.2} below threshold {:.2}",
                        c, self.config.confidence_threshold
                    ),
                ),
            };
            if action == CacheAction::Preserve {
                preserve_count += 1;
            }
            confidence_sum += confidence.unwrap_or(0.0);

            decisions.push(RegenerationDecision {
                type_text: audit.type_text.clone(),
                path: audit.path.clone(),
                action,
                confidence,
                reason,
            });
        }

        let total = decisions.len();
        let report = RegenerationReport {
            total_entries: total,
            preserve_count,
            regenerate_count: total - preserve_count,
            high_confidence_preserved,
            average_confidence: if total == 0 {
                0.0
            } else {
                confidence_sum / total as f64
            },
            duration_ms: started.elapsed().as_millis() as u64,
            generated_at: Utc::now(),
            decisions,
        };
        info!(
            "Cache report: {} preserve, {} regenerate ({} high confidence)",
            report.preserve_count, report.regenerate_count, report.high_confidence_preserved
        );
        report
    }

    /// Bucket a report's confidences. Unknown confidence counts as poor.
    pub fn cache_health_metrics(&self, report: &RegenerationReport) -> CacheHealthMetrics {
        let mut metrics = CacheHealthMetrics {
            total: report.decisions.len(),
            excellent: 0,
            good: 0,
            acceptable: 0,
            poor: 0,
            excellent_pct: 0.0,
            good_pct: 0.0,
            acceptable_pct: 0.0,
            poor_pct: 0.0,
        };
        for decision in &report.decisions {
            match decision.confidence {
                Some(c) if c >= EXCELLENT => metrics.excellent += 1,
                Some(c) if c >= GOOD => metrics.good += 1,
                Some(c) if c >= ACCEPTABLE => metrics.acceptable += 1,
                _ => metrics.poor += 1,
            }
        }
        if metrics.total > 0 {
            let pct = |n: usize| n as f64 * 100.0 / metrics.total as f64;
            metrics.excellent_pct = pct(metrics.excellent);
            metrics.good_pct = pct(metrics.good);
            metrics.acceptable_pct = pct(metrics.acceptable);
            metrics.poor_pct = pct(metrics.poor);
        }
        metrics
    }
}

/// Audit one cache file. A file that vanished since the scan is skipped.
async fn audit_entry(path: PathBuf) -> Option<CacheAudit> {
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Skipping cache file {}: {}", path.display(), e);
            return None;
        }
    };
    let declared = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => serde_json::from_str::<serde_json::Value>(&raw)
            .ok()
            .and_then(|v| v.get("typeText").and_then(|t| t.as_str()).map(str::to_string)),
        Err(e) => {
            warn!("Failed to read cache file {}: {}", path.display(), e);
            None
        }
    };
    let (type_text, label_derived) = match declared {
        Some(t) => (t, false),
        None => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (format!("<unknown:{}>", stem), true)
        }
    };
    Some(CacheAudit {
        type_text,
        label_derived,
        size_bytes: metadata.len(),
        created_at: metadata.created().ok().map(DateTime::<Utc>::from),
        modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        path,
    })
}
