//! Result cache and the Cache Manager.
//!
//! Each successful synthesis is stored as one JSON [`CacheEntry`] file. The
//! [`CacheManager`] later combines those files with the Audit Log to decide
//! which entries can be trusted and which must be resynthesized.

mod manager;
mod store;
mod types;

use std::path::Path;

use crate::audit::SharedAuditLog;
use crate::error::Result;

pub use manager::CacheManager;
pub use store::CacheStore;
pub use types::{
    CacheAction, CacheAudit, CacheEntry, CacheHealthMetrics, CacheLookup, CacheManagerConfig,
    RegenerationDecision, RegenerationReport,
};

/// Scan `cache_dir` and classify every entry against `audit_log`.
pub async fn audit_and_report(
    cache_dir: impl AsRef<Path>,
    audit_log: SharedAuditLog,
) -> Result<RegenerationReport> {
    let manager = CacheManager::new(audit_log);
    let audits = manager.audit_cache_entries(cache_dir).await?;
    Ok(manager.generate_regeneration_report(&audits).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditLog, CandidateSelectionAudit, RunId};
    use crate::fingerprint::Fingerprint;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(type_text: &str) -> CacheEntry {
        CacheEntry {
            type_text: type_text.to_string(),
            fingerprint: Fingerprint::compute(type_text, &[] as &[&str]),
            dependencies: Vec::new(),
            value: json!(102),
            attempts: 1,
            heuristics: None,
            constraints: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_audit_and_report_over_a_cache_dir() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        store.write(&entry("{Even}")).await.unwrap();
        store.write(&entry("{Odd}")).await.unwrap();

        let log = AuditLog::new().into_shared();
        let mut selection =
            CandidateSelectionAudit::from_ranking(RunId::new(), "{Even}", 1, Vec::new(), "seeded");
        selection.confidence = 0.8;
        log.write().await.record_candidate_selection(selection);

        let report = audit_and_report(dir.path(), log).await.unwrap();
        assert_eq!(report.total_entries, 2);
        assert_eq!(report.preserve_count, 1);
        assert_eq!(report.regenerate_count, 1);
        assert_eq!(report.high_confidence_preserved, 0);

        let even = report
            .decisions
            .iter()
            .find(|d| d.type_text == "{Even}")
            .unwrap();
        assert_eq!(even.action, CacheAction::Preserve);
    }

    #[tokio::test]
    async fn test_audit_and_report_on_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let report = audit_and_report(dir.path().join("absent"), AuditLog::new().into_shared())
            .await
            .unwrap();
        assert_eq!(report.total_entries, 0);
        assert!(report.decisions.is_empty());
    }
}
