//! In-memory map store for tests and local tooling.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::map::ContactsMap;
use crate::store::{refs_match, MapStore, StoreError, StoredMap};

#[derive(Default)]
pub struct InMemoryMapStore {
    inner: Mutex<HashMap<String, VersionedDoc>>,
}

struct VersionedDoc {
    map: ContactsMap,
    ref_token: String,
    seq: u64,
}

impl InMemoryMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ref_for(job_id: &str, seq: u64) -> String {
        format!("mem/{job_id}/v{seq}")
    }
}

#[async_trait]
impl MapStore for InMemoryMapStore {
    async fn fetch(&self, job_id: &str) -> Result<StoredMap, StoreError> {
        let inner = self.inner.lock().expect("map store lock poisoned");
        let doc = inner
            .get(job_id)
            .ok_or_else(|| StoreError::MissingMap(job_id.to_string()))?;
        Ok(StoredMap {
            map: doc.map.clone(),
            ref_token: doc.ref_token.clone(),
        })
    }

    async fn create(&self, job_id: &str, map: &ContactsMap) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().expect("map store lock poisoned");
        if inner.contains_key(job_id) {
            return Err(StoreError::AlreadyExists(job_id.to_string()));
        }
        let ref_token = Self::ref_for(job_id, 1);
        inner.insert(
            job_id.to_string(),
            VersionedDoc {
                map: map.clone(),
                ref_token: ref_token.clone(),
                seq: 1,
            },
        );
        Ok(ref_token)
    }

    async fn compare_and_swap(
        &self,
        job_id: &str,
        base_ref: &str,
        map: &ContactsMap,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().expect("map store lock poisoned");
        let doc = inner
            .get_mut(job_id)
            .ok_or_else(|| StoreError::MissingMap(job_id.to_string()))?;
        if !refs_match(base_ref, &doc.ref_token) {
            return Err(StoreError::StaleRef {
                base_ref: base_ref.to_string(),
            });
        }
        doc.seq += 1;
        doc.map = map.clone();
        doc.ref_token = Self::ref_for(job_id, doc.seq);
        Ok(doc.ref_token.clone())
    }
}
