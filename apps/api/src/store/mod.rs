//! Versioned storage for contacts maps.
//!
//! The store is the only holder of the authoritative map + ref pair. Every
//! mutation goes through `compare_and_swap`: the caller presents the ref it
//! computed against, and the swap succeeds only if that ref still names the
//! current version. Ref comparison is atomic with the update, per job.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::map::ContactsMap;

/// The current document and the ref that names this exact version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMap {
    pub map: ContactsMap,
    pub ref_token: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no contacts map stored for job '{0}'")]
    MissingMap(String),

    #[error("job '{0}' already has a contacts map")]
    AlreadyExists(String),

    #[error("ref '{base_ref}' no longer names the current version")]
    StaleRef { base_ref: String },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

#[async_trait]
pub trait MapStore: Send + Sync {
    /// Returns the current map and ref for a job.
    async fn fetch(&self, job_id: &str) -> Result<StoredMap, StoreError>;

    /// Stores the initial map for a job and returns its first ref.
    /// Fails with `AlreadyExists` rather than overwriting.
    async fn create(&self, job_id: &str, map: &ContactsMap) -> Result<String, StoreError>;

    /// Atomically replaces the document if `base_ref` still names the current
    /// version. Returns the new ref on success, `StaleRef` otherwise. Every
    /// accepted swap produces a fresh ref, even for an identical map.
    async fn compare_and_swap(
        &self,
        job_id: &str,
        base_ref: &str,
        map: &ContactsMap,
    ) -> Result<String, StoreError>;
}

/// Canonical form for ref comparison. Refs derived from file paths may cross
/// platforms, so backslashes fold to forward slashes and whitespace is
/// trimmed before comparing.
pub fn canon_ref(s: &str) -> String {
    s.replace('\\', "/").trim().to_string()
}

/// True when both refs canonicalize to the same non-empty token.
pub fn refs_match(a: &str, b: &str) -> bool {
    let a = canon_ref(a);
    !a.is_empty() && a == canon_ref(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canon_ref_folds_backslashes() {
        assert_eq!(
            canon_ref("jobs\\j1\\contacts_map_v1.json"),
            "jobs/j1/contacts_map_v1.json"
        );
    }

    #[test]
    fn test_canon_ref_trims_whitespace() {
        assert_eq!(canon_ref("  jobs/j1/v1.json \n"), "jobs/j1/v1.json");
    }

    #[test]
    fn test_refs_match_across_platform_styles() {
        assert!(refs_match("jobs\\j1\\v1.json", "jobs/j1/v1.json"));
        assert!(!refs_match("jobs/j1/v1.json", "jobs/j1/v2.json"));
    }

    #[test]
    fn test_empty_ref_never_matches() {
        assert!(!refs_match("", ""));
        assert!(!refs_match("  ", "  "));
    }
}
