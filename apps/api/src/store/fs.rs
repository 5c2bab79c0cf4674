//! File-backed map store.
//!
//! Layout under the storage root:
//!
//! ```text
//! jobs/<job_id>/contacts_map_<utc-timestamp>_<uuid>.json   one file per accepted version
//! jobs/<job_id>/current                                    ref of the current version
//! ```
//!
//! The ref IS the snapshot's root-relative path (forward slashes), so every
//! accepted mutation yields a fresh ref and old versions stay on disk as an
//! audit trail. A per-process mutex serializes the check-and-set window; the
//! pointer write is the commit point.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::map::ContactsMap;
use crate::store::{canon_ref, refs_match, MapStore, StoreError, StoredMap};

pub struct FsMapStore {
    root: PathBuf,
    gate: Mutex<()>,
}

impl FsMapStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("jobs"))
            .with_context(|| format!("creating storage root {}", root.display()))?;
        Ok(Self {
            root,
            gate: Mutex::new(()),
        })
    }

    fn job_dir(&self, job_id: &str) -> PathBuf {
        self.root.join("jobs").join(job_id)
    }

    fn pointer_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join("current")
    }

    fn current_ref(&self, job_id: &str) -> Result<Option<String>> {
        let pointer = self.pointer_path(job_id);
        if !pointer.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&pointer)
            .with_context(|| format!("reading pointer {}", pointer.display()))?;
        Ok(Some(canon_ref(&raw)))
    }

    fn read_snapshot(&self, ref_token: &str) -> Result<ContactsMap> {
        let path = self.root.join(ref_token);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("decoding snapshot {}", path.display()))
    }

    /// Writes a new snapshot file and returns its ref. The pointer is not
    /// touched here; callers update it once the swap is decided.
    fn write_snapshot(&self, job_id: &str, map: &ContactsMap) -> Result<String> {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.6f");
        let fname = format!("contacts_map_{stamp}_{}.json", Uuid::new_v4().simple());
        let path = dir.join(&fname);
        let body = serde_json::to_vec_pretty(map).context("encoding contacts map")?;
        fs::write(&path, body).with_context(|| format!("writing snapshot {}", path.display()))?;

        Ok(format!("jobs/{job_id}/{fname}"))
    }

    fn commit_pointer(&self, job_id: &str, ref_token: &str) -> Result<()> {
        let pointer = self.pointer_path(job_id);
        fs::write(&pointer, ref_token)
            .with_context(|| format!("writing pointer {}", pointer.display()))
    }
}

#[async_trait]
impl MapStore for FsMapStore {
    async fn fetch(&self, job_id: &str) -> Result<StoredMap, StoreError> {
        let ref_token = self
            .current_ref(job_id)?
            .filter(|r| !r.is_empty())
            .ok_or_else(|| StoreError::MissingMap(job_id.to_string()))?;
        let map = self.read_snapshot(&ref_token)?;
        Ok(StoredMap { map, ref_token })
    }

    async fn create(&self, job_id: &str, map: &ContactsMap) -> Result<String, StoreError> {
        let _guard = self.gate.lock().expect("store gate poisoned");
        if self.current_ref(job_id)?.is_some() {
            return Err(StoreError::AlreadyExists(job_id.to_string()));
        }
        let ref_token = self.write_snapshot(job_id, map)?;
        self.commit_pointer(job_id, &ref_token)?;
        debug!(job_id, %ref_token, "created contacts map");
        Ok(ref_token)
    }

    async fn compare_and_swap(
        &self,
        job_id: &str,
        base_ref: &str,
        map: &ContactsMap,
    ) -> Result<String, StoreError> {
        let _guard = self.gate.lock().expect("store gate poisoned");
        let current = self
            .current_ref(job_id)?
            .ok_or_else(|| StoreError::MissingMap(job_id.to_string()))?;
        if !refs_match(base_ref, &current) {
            return Err(StoreError::StaleRef {
                base_ref: base_ref.to_string(),
            });
        }
        let ref_token = self.write_snapshot(job_id, map)?;
        self.commit_pointer(job_id, &ref_token)?;
        debug!(job_id, %ref_token, "advanced contacts map");
        Ok(ref_token)
    }
}

/// Seeds a job's map from a JSON file unless the job already has one.
/// Returns the current ref either way.
pub async fn seed_job_from_file(
    store: &FsMapStore,
    job_id: &str,
    path: &Path,
) -> Result<String, StoreError> {
    match store.fetch(job_id).await {
        Ok(existing) => Ok(existing.ref_token),
        Err(StoreError::MissingMap(_)) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading seed file {}", path.display()))?;
            let map: ContactsMap = serde_json::from_str(&raw)
                .with_context(|| format!("decoding seed file {}", path.display()))?;
            store.create(job_id, &map).await
        }
        Err(e) => Err(e),
    }
}
