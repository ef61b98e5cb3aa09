//! Content hashing for bundle fingerprints, predicate ids and cache keys.
//!
//! All hashes are SHA-256 rendered as lowercase hex. A fingerprint covers a
//! bundle's textual form plus every structural dependency and is the sole
//! cache-validity key: identical inputs always hash identically, and changing
//! any dependency's text changes the fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash arbitrary content to a full-length hex digest.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash content to a short (16 hex chars) key, used for file names and ids.
pub fn short_hash(content: &str) -> String {
    let mut full = content_hash(content);
    full.truncate(16);
    full
}

/// Fingerprint of a constraint bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Compute the fingerprint of a bundle and its dependencies.
    ///
    /// Dependencies are treated as a set: their order does not matter, but
    /// every byte of their text does.
    pub fn compute<S: AsRef<str>>(type_text: &str, dependencies: &[S]) -> Self {
        let mut deps: Vec<&str> = dependencies.iter().map(|d| d.as_ref()).collect();
        deps.sort_unstable();
        deps.dedup();

        let mut hasher = Sha256::new();
        hasher.update(format!("type:{}:", type_text.len()).as_bytes());
        hasher.update(type_text.as_bytes());
        hasher.update(b"\n");
        for dep in deps {
            // Length prefixes keep ["ab", "c"] distinct from ["a", "bc"]
            hasher.update(format!("dep:{}:", dep.len()).as_bytes());
            hasher.update(dep.as_bytes());
            hasher.update(b"\n");
        }

        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short: String = self.0.chars().take(16).collect();
        write!(f, "{}", short)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let deps = ["type Even = number", "type GreaterThanX<N> = number"];
        let a = Fingerprint::compute("Even & GreaterThanX<100>", &deps);
        let b = Fingerprint::compute("Even & GreaterThanX<100>", &deps);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_dependency_change_changes_fingerprint() {
        let a = Fingerprint::compute("Even", &["type Even = number"]);
        let b = Fingerprint::compute("Even", &["type Even = number & {}"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_dependency_order_is_irrelevant() {
        let a = Fingerprint::compute("T", &["a", "b"]);
        let b = Fingerprint::compute("T", &["b", "a"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_type_text_cannot_impersonate_a_dependency() {
        let embedded = Fingerprint::compute::<&str>("T\ndep:1:a", &[]);
        let separate = Fingerprint::compute("T", &["a"]);
        assert_ne!(embedded, separate);
    }

    #[test]
    fn test_short_hash_prefix() {
        let full = content_hash("x => x % 2 === 0");
        let short = short_hash("x => x % 2 === 0");
        assert_eq!(short.len(), 16);
        assert!(full.starts_with(&short));
    }

    proptest! {
        #[test]
        fn fingerprint_stable_across_runs(
            type_text in "[A-Za-z<>&| ]{1,40}",
            deps in proptest::collection::vec("[ -~]{0,30}", 0..5)
        ) {
            let first = Fingerprint::compute(&type_text, &deps);
            let second = Fingerprint::compute(&type_text, &deps);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn appending_to_a_dependency_changes_fingerprint(
            dep in "[a-z]{1,20}",
            suffix in "[a-z]{1,5}"
        ) {
            let before = Fingerprint::compute("T", &[dep.clone()]);
            let after = Fingerprint::compute("T", &[format!("{}{}", dep, suffix)]);
            prop_assert_ne!(before, after);
        }
    }
}
