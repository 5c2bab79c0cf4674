//! Server-side orchestration for the contacts map: fetch, validate, apply,
//! compare-and-swap, and contact resolution. The store's CAS is the only
//! path that mutates the document.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::{MapApi, MapApiError};
use crate::directory::ContactDirectory;
use crate::errors::AppError;
use crate::mapdoc::ops::apply_ops;
use crate::models::map::{ContactsMap, MapSnapshot, PatchOp};
use crate::store::{refs_match, MapStore, StoreError};

#[derive(Clone)]
pub struct MapService {
    store: Arc<dyn MapStore>,
    directory: Arc<dyn ContactDirectory>,
}

impl MapService {
    pub fn new(store: Arc<dyn MapStore>, directory: Arc<dyn ContactDirectory>) -> Self {
        Self { store, directory }
    }

    /// Full current document plus resolved contact summaries.
    pub async fn get_map(&self, job_id: &str) -> Result<MapSnapshot, AppError> {
        let stored = self.store.fetch(job_id).await.map_err(store_error)?;
        self.snapshot(stored.map, stored.ref_token).await
    }

    /// Applies `ops` atomically against `base_ref`.
    ///
    /// Ref staleness is checked before op validation, so a stale writer gets
    /// `Conflict` even when its ops would no longer validate. The CAS at the
    /// end re-checks the ref, which closes the window between fetch and swap.
    pub async fn patch_map(
        &self,
        job_id: &str,
        base_ref: &str,
        ops: &[PatchOp],
    ) -> Result<MapSnapshot, AppError> {
        let stored = self.store.fetch(job_id).await.map_err(store_error)?;
        if !refs_match(base_ref, &stored.ref_token) {
            debug!(job_id, base_ref, current = %stored.ref_token, "stale ref on patch");
            return Err(AppError::Conflict(
                "Map changed; refresh and try again".to_string(),
            ));
        }

        let next = apply_ops(&stored.map, ops).map_err(|e| AppError::Validation(e.to_string()))?;
        let ref_token = self
            .store
            .compare_and_swap(job_id, base_ref, &next)
            .await
            .map_err(store_error)?;

        info!(job_id, ops = ops.len(), %ref_token, "contacts map patched");
        self.snapshot(next, ref_token).await
    }

    /// Ref-guarded wholesale overwrite. Returns only the new ref; callers
    /// that need the resolved document follow up with `get_map`.
    pub async fn replace_map(
        &self,
        job_id: &str,
        base_ref: &str,
        map: ContactsMap,
    ) -> Result<String, AppError> {
        let ref_token = self
            .store
            .compare_and_swap(job_id, base_ref, &map)
            .await
            .map_err(store_error)?;
        info!(job_id, %ref_token, "contacts map replaced");
        Ok(ref_token)
    }

    async fn snapshot(&self, map: ContactsMap, ref_token: String) -> Result<MapSnapshot, AppError> {
        let ids: Vec<String> = map
            .values()
            .flatten()
            .flat_map(|block| block.contacts.iter().cloned())
            .collect();
        let contacts_by_id = self.directory.resolve(&ids).await?;
        Ok(MapSnapshot {
            map,
            contacts_by_id,
            ref_token,
        })
    }
}

fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::MissingMap(job_id) => {
            AppError::NotFound(format!("No contacts map for job '{job_id}'"))
        }
        StoreError::AlreadyExists(job_id) => {
            AppError::Validation(format!("Job '{job_id}' already has a contacts map"))
        }
        StoreError::StaleRef { .. } => {
            AppError::Conflict("Map changed; refresh and try again".to_string())
        }
        StoreError::Io(e) => AppError::Internal(e),
    }
}

/// In-process transport: lets the editing client run directly against the
/// service, so the session core is testable without a network or a server.
#[async_trait]
impl MapApi for MapService {
    async fn fetch_map(&self, job_id: &str) -> Result<MapSnapshot, MapApiError> {
        self.get_map(job_id).await.map_err(api_error)
    }

    async fn apply_ops(
        &self,
        job_id: &str,
        base_ref: &str,
        ops: &[PatchOp],
    ) -> Result<MapSnapshot, MapApiError> {
        self.patch_map(job_id, base_ref, ops).await.map_err(api_error)
    }
}

fn api_error(err: AppError) -> MapApiError {
    match err {
        AppError::NotFound(msg) => MapApiError::NotFound(msg),
        AppError::Validation(msg) => MapApiError::Validation(msg),
        AppError::Conflict(_) => MapApiError::Conflict,
        AppError::Unauthorized => MapApiError::Unauthorized,
        AppError::Internal(e) => MapApiError::Transient(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{ContactRecord, InMemoryDirectory};
    use crate::models::map::EvidenceBlock;
    use crate::store::memory::InMemoryMapStore;

    fn plumbing_map() -> ContactsMap {
        let mut map = ContactsMap::new();
        map.insert(
            "plumbing".to_string(),
            vec![EvidenceBlock {
                note: "p1".to_string(),
                pages: vec!["3".to_string()],
                contacts: vec!["c1".to_string()],
                original_name: None,
            }],
        );
        map
    }

    fn directory() -> InMemoryDirectory {
        let mk = |id: &str, name: &str| ContactRecord {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            company: None,
            trade: Some("plumbing".to_string()),
            service_area: None,
            tags: None,
        };
        InMemoryDirectory::new(vec![mk("c1", "Ada Pipeworks"), mk("c2", "Crane Plumbing Co")])
    }

    async fn service_with_job(job_id: &str) -> (MapService, String) {
        let store = Arc::new(InMemoryMapStore::new());
        let base_ref = store.create(job_id, &plumbing_map()).await.unwrap();
        let service = MapService::new(store, Arc::new(directory()));
        (service, base_ref)
    }

    #[tokio::test]
    async fn test_add_then_load_shows_contact_and_summary() {
        let (service, base_ref) = service_with_job("j1").await;
        service
            .patch_map("j1", &base_ref, &[PatchOp::add("plumbing", 0, "c2")])
            .await
            .unwrap();

        let snap = service.get_map("j1").await.unwrap();
        assert_eq!(snap.map["plumbing"][0].contacts, vec!["c1", "c2"]);
        assert_eq!(snap.contacts_by_id["c2"].name, "Crane Plumbing Co");
    }

    #[tokio::test]
    async fn test_scenario_add_then_stale_remove_conflicts() {
        let (service, r1) = service_with_job("j1").await;

        let after = service
            .patch_map("j1", &r1, &[PatchOp::add("plumbing", 0, "c2")])
            .await
            .unwrap();
        assert_eq!(after.map["plumbing"][0].contacts, vec!["c1", "c2"]);
        assert_ne!(after.ref_token, r1);

        // a second client still holding r1
        let err = service
            .patch_map("j1", &r1, &[PatchOp::remove("plumbing", 0, "c1")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replaying_successful_patch_with_stale_ref_conflicts() {
        let (service, r1) = service_with_job("j1").await;
        let ops = [PatchOp::add("plumbing", 0, "c2")];
        service.patch_map("j1", &r1, &ops).await.unwrap();

        let err = service.patch_map("j1", &r1, &ops).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // no duplicate mutation happened
        let snap = service.get_map("j1").await.unwrap();
        assert_eq!(snap.map["plumbing"][0].contacts, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_remove_absent_contact_validation_leaves_document_unchanged() {
        let (service, base_ref) = service_with_job("j1").await;
        let err = service
            .patch_map("j1", &base_ref, &[PatchOp::remove("plumbing", 0, "ghost")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let snap = service.get_map("j1").await.unwrap();
        assert_eq!(snap.ref_token, base_ref);
        assert_eq!(snap.map, plumbing_map());
    }

    #[tokio::test]
    async fn test_concurrent_patches_exactly_one_wins() {
        let (service, base_ref) = service_with_job("j1").await;

        let ops_a = [PatchOp::add("plumbing", 0, "c2")];
        let ops_b = [PatchOp::remove("plumbing", 0, "c1")];
        let (a, b) = tokio::join!(
            service.patch_map("j1", &base_ref, &ops_a),
            service.patch_map("j1", &base_ref, &ops_b),
        );
        assert_eq!(
            [a.is_ok(), b.is_ok()].iter().filter(|w| **w).count(),
            1,
            "exactly one writer must win"
        );

        // the loser reloads and sees the winner's document
        let winner = if a.is_ok() { a.unwrap() } else { b.unwrap() };
        let reloaded = service.get_map("j1").await.unwrap();
        assert_eq!(reloaded.map, winner.map);
        assert_eq!(reloaded.ref_token, winner.ref_token);
    }

    #[tokio::test]
    async fn test_empty_op_list_advances_ref_and_keeps_map() {
        let (service, base_ref) = service_with_job("j1").await;
        let snap = service.patch_map("j1", &base_ref, &[]).await.unwrap();
        assert_ne!(snap.ref_token, base_ref);
        assert_eq!(snap.map, plumbing_map());
    }

    #[tokio::test]
    async fn test_patch_unknown_job_is_not_found() {
        let (service, _) = service_with_job("j1").await;
        let err = service
            .patch_map("ghost", "r1", &[PatchOp::add("plumbing", 0, "c2")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_replace_is_ref_guarded() {
        let (service, base_ref) = service_with_job("j1").await;
        let new_ref = service
            .replace_map("j1", &base_ref, ContactsMap::new())
            .await
            .unwrap();
        assert_ne!(new_ref, base_ref);

        let err = service
            .replace_map("j1", &base_ref, plumbing_map())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let snap = service.get_map("j1").await.unwrap();
        assert!(snap.map.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_contact_ids_render_without_summary() {
        let (service, base_ref) = service_with_job("j1").await;
        let snap = service
            .patch_map("j1", &base_ref, &[PatchOp::add("plumbing", 0, "offbook-1")])
            .await
            .unwrap();
        assert!(snap.map["plumbing"][0].contacts.contains(&"offbook-1".to_string()));
        assert!(!snap.contacts_by_id.contains_key("offbook-1"));
    }
}
