//! Content-addressed registry of compiled predicates.
//!
//! Entries are keyed by a hash of their predicate source, so two constraints
//! with identical source always share one entry. Persistence writes a JSON
//! array sorted by id; unchanged data produces byte-identical files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::fingerprint::short_hash;

/// Registry shared across synthesis runs within one build.
pub type SharedPredicateRegistry = Arc<RwLock<PredicateRegistry>>;

/// Id of a predicate: short content hash of its source text.
pub fn predicate_id(predicate_source: &str) -> String {
    short_hash(predicate_source)
}

/// One registered predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateRegistryEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub predicate_source: String,
}

impl PredicateRegistryEntry {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        predicate_source: impl Into<String>,
    ) -> Self {
        let predicate_source = predicate_source.into();
        Self {
            id: predicate_id(&predicate_source),
            name: name.into(),
            description: description.into(),
            predicate_source,
        }
    }
}

/// Insert-or-reuse store of predicates.
#[derive(Debug, Default)]
pub struct PredicateRegistry {
    entries: BTreeMap<String, PredicateRegistryEntry>,
    path: Option<PathBuf>,
    dirty: bool,
}

impl PredicateRegistry {
    /// Create an empty in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a registry backed by a JSON file, loading it if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_path(path.as_ref());
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let list: Vec<PredicateRegistryEntry> = serde_json::from_str(&raw)?;
            list.into_iter().map(|e| (e.id.clone(), e)).collect()
        } else {
            BTreeMap::new()
        };
        debug!("Opened predicate registry at {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            entries,
            path: Some(path),
            dirty: false,
        })
    }

    /// Wrap for sharing across tasks.
    pub fn into_shared(self) -> SharedPredicateRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register a predicate and return its id.
    ///
    /// An existing entry is left untouched when every field matches; if any
    /// field differs it is replaced wholesale by the newer metadata.
    pub fn register(&mut self, entry: PredicateRegistryEntry) -> String {
        let id = entry.id.clone();
        match self.entries.get(&id) {
            Some(existing) if *existing == entry => {}
            _ => {
                self.entries.insert(id.clone(), entry);
                self.dirty = true;
            }
        }
        id
    }

    pub fn get(&self, id: &str) -> Option<&PredicateRegistryEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entries ordered by id.
    pub fn entries(&self) -> impl Iterator<Item = &PredicateRegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Deterministic serialization: pretty JSON array sorted by id, newline-terminated.
    pub fn to_json(&self) -> Result<String> {
        let list: Vec<&PredicateRegistryEntry> = self.entries.values().collect();
        let mut out = serde_json::to_string_pretty(&list)?;
        out.push('\n');
        Ok(out)
    }

    /// Write to the backing file if anything changed. Returns whether a write happened.
    pub fn persist(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };
        self.persist_to(&path)?;
        Ok(true)
    }

    /// Take the pending write, if any, and mark the registry clean.
    ///
    /// Call [`mark_dirty`](Self::mark_dirty) if writing the snapshot fails.
    pub fn take_snapshot(&mut self) -> Result<Option<RegistrySnapshot>> {
        if !self.dirty {
            return Ok(None);
        }
        let Some(path) = self.path.clone() else {
            return Ok(None);
        };
        let body = self.to_json()?;
        self.dirty = false;
        Ok(Some(RegistrySnapshot { path, body }))
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Write to an explicit path regardless of the dirty flag.
    pub fn persist_to(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        self.dirty = false;
        debug!("Persisted {} predicates to {}", self.entries.len(), path.display());
        Ok(())
    }
}

/// Serialized registry contents, written without holding the registry lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub path: PathBuf,
    pub body: String,
}

impl RegistrySnapshot {
    /// Write atomically (temp file then rename).
    pub async fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &self.body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Persisted predicate registry to {}", self.path.display());
        Ok(())
    }
}

pub(crate) fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_identical_source_collapses_to_one_entry() {
        let mut registry = PredicateRegistry::new();
        let a = registry.register(PredicateRegistryEntry::new("even", "must be even", "x => x % 2 === 0"));
        let b = registry.register(PredicateRegistryEntry::new("even", "must be even", "x => x % 2 === 0"));
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_changed_metadata_replaces_entry() {
        let mut registry = PredicateRegistry::new();
        let id = registry.register(PredicateRegistryEntry::new("even", "old", "x => x % 2 === 0"));
        registry.dirty = false;

        registry.register(PredicateRegistryEntry::new("isEven", "new", "x => x % 2 === 0"));
        assert!(registry.is_dirty());
        let entry = registry.get(&id).unwrap();
        assert_eq!(entry.name, "isEven");
        assert_eq!(entry.description, "new");
    }

    #[test]
    fn test_persist_is_noop_when_clean() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predicates.json");
        let mut registry = PredicateRegistry::open(&path).unwrap();
        assert!(!registry.persist().unwrap());
        assert!(!path.exists());

        registry.register(PredicateRegistryEntry::new("pos", "positive", "x => x > 0"));
        assert!(registry.persist().unwrap());
        assert!(!registry.persist().unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_writes_outside_the_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("predicates.json");
        let shared = PredicateRegistry::open(&path).unwrap().into_shared();
        assert_eq!(shared.write().await.take_snapshot().unwrap(), None);

        shared
            .write()
            .await
            .register(PredicateRegistryEntry::new("even", "even", "x => x % 2 === 0"));
        let snapshot = shared.write().await.take_snapshot().unwrap().unwrap();
        assert!(!shared.read().await.is_dirty());

        snapshot.write().await.unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, shared.read().await.to_json().unwrap());
        assert_eq!(PredicateRegistry::open(&path).unwrap().len(), 1);

        shared.write().await.mark_dirty();
        assert!(shared.write().await.take_snapshot().unwrap().is_some());
    }

    #[test]
    fn test_persist_is_byte_identical_and_sorted() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");

        let mut forward = PredicateRegistry::new();
        let mut backward = PredicateRegistry::new();
        let defs = [
            ("even", "x => x % 2 === 0"),
            ("big", "x => x > 100"),
            ("int", "x => Number.isInteger(x)"),
        ];
        for (name, src) in defs.iter() {
            forward.register(PredicateRegistryEntry::new(*name, *name, *src));
        }
        for (name, src) in defs.iter().rev() {
            backward.register(PredicateRegistryEntry::new(*name, *name, *src));
        }
        forward.persist_to(&first).unwrap();
        backward.persist_to(&second).unwrap();

        let a = std::fs::read(&first).unwrap();
        let b = std::fs::read(&second).unwrap();
        assert_eq!(a, b);

        let parsed: Vec<PredicateRegistryEntry> = serde_json::from_slice(&a).unwrap();
        let ids: Vec<_> = parsed.iter().map(|e| e.id.clone()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_reopen_round_trips_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/predicates.json");
        let mut registry = PredicateRegistry::open(&path).unwrap();
        let id = registry.register(PredicateRegistryEntry::new("odd", "must be odd", "x => x % 2 === 1"));
        registry.persist().unwrap();

        let reopened = PredicateRegistry::open(&path).unwrap();
        assert!(reopened.contains(&id));
        assert!(!reopened.is_dirty());
        assert!(std::fs::read_to_string(&path).unwrap().contains("predicateSource"));
    }
}
