//! One JSON file per bundle, keyed by a hash of the bundle identity.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::types::{CacheEntry, CacheLookup};
use crate::error::{Error, Result};
use crate::fingerprint::{short_hash, Fingerprint};
use crate::predicate::expand_path;

/// Directory-backed store of [`CacheEntry`] files.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// `~` in `dir` is expanded; the directory is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: expand_path(dir.as_ref()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the entry for a bundle.
    pub fn path_for(&self, type_text: &str) -> PathBuf {
        self.dir.join(format!("{}.json", short_hash(type_text)))
    }

    /// Read the entry for a bundle. Missing or unreadable files are a miss.
    pub async fn read(&self, type_text: &str) -> Option<CacheEntry> {
        let path = self.path_for(type_text);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Look up a bundle, checking the fingerprint.
    pub async fn lookup(&self, type_text: &str, fingerprint: &Fingerprint) -> CacheLookup {
        match self.read(type_text).await {
            None => CacheLookup::Miss,
            Some(entry) if entry.type_text != type_text => {
                debug!("Cache file for '{}' belongs to '{}'", type_text, entry.type_text);
                CacheLookup::Miss
            }
            Some(entry) if &entry.fingerprint == fingerprint => CacheLookup::Hit(entry),
            Some(entry) => CacheLookup::Stale(entry),
        }
    }

    /// Write an entry atomically (temp file then rename).
    pub async fn write(&self, entry: &CacheEntry) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&entry.type_text);
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            short_hash(&entry.type_text),
            uuid::Uuid::new_v4().simple()
        ));

        let mut body = serde_json::to_string_pretty(entry)?;
        body.push('\n');
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::Cache(format!(
                "failed to move cache entry into {}: {}",
                path.display(),
                e
            )));
        }
        debug!("Wrote cache entry for '{}' to {}", entry.type_text, path.display());
        Ok(path)
    }
}
