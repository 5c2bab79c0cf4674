pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::directory::handlers as directory_handlers;
use crate::mapdoc::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/jobs/:job_id/contacts-map",
            get(handlers::handle_get_map)
                .put(handlers::handle_replace_map)
                .patch(handlers::handle_patch_map),
        )
        .route(
            "/jobs/:job_id/contacts/search",
            post(directory_handlers::handle_search_contacts),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::client::compiler::EditIntent;
    use crate::client::http::HttpMapApi;
    use crate::client::session::{EditOutcome, EditSession};
    use crate::client::{MapApi, MapApiError};
    use crate::config::Config;
    use crate::directory::{ContactRecord, InMemoryDirectory};
    use crate::mapdoc::service::MapService;
    use crate::models::map::{ContactsMap, EvidenceBlock};
    use crate::state::AppState;
    use crate::store::memory::InMemoryMapStore;
    use crate::store::MapStore;

    const TOKEN: &str = "test-token";

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

    /// Serves the real router on an ephemeral port with an in-memory store
    /// holding job "j1"; returns the base URL.
    async fn spawn_server() -> String {
        let store = Arc::new(InMemoryMapStore::new());
        store.create("j1", &plumbing_map()).await.unwrap();

        let directory = Arc::new(InMemoryDirectory::new(vec![
            ContactRecord {
                id: "c1".to_string(),
                name: "Ada Pipeworks".to_string(),
                email: None,
                company: None,
                trade: Some("plumbing".to_string()),
                service_area: Some("north".to_string()),
                tags: None,
            },
            ContactRecord {
                id: "c2".to_string(),
                name: "Crane Plumbing Co".to_string(),
                email: None,
                company: None,
                trade: Some("plumbing".to_string()),
                service_area: Some("south".to_string()),
                tags: None,
            },
        ]));

        let service = MapService::new(store, directory.clone());
        let state = AppState {
            service,
            directory,
            config: Config {
                storage_root: std::path::PathBuf::from("unused-in-tests"),
                api_token: TOKEN.to_string(),
                contacts_path: None,
                seed_jobs_dir: None,
                port: 0,
                rust_log: "info".to_string(),
            },
        };

        let app = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn add_intent(ids: &[&str]) -> EditIntent {
        EditIntent::AddContacts {
            trade: "plumbing".to_string(),
            block: 0,
            contact_ids: ids.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_edit_round_trip_over_http() {
        let base_url = spawn_server().await;
        let mut session = EditSession::new(HttpMapApi::new(&base_url, TOKEN), "j1");

        session.load().await.unwrap();
        let outcome = session.submit(add_intent(&["c2"])).await.unwrap();
        assert_eq!(outcome, EditOutcome::Applied);

        let snap = session.view().snapshot().unwrap();
        assert_eq!(snap.map["plumbing"][0].contacts, vec!["c1", "c2"]);
        assert_eq!(snap.contacts_by_id["c2"].name, "Crane Plumbing Co");
    }

    #[tokio::test]
    async fn test_conflict_over_http_refreshes_loser() {
        let base_url = spawn_server().await;
        let mut winner = EditSession::new(HttpMapApi::new(&base_url, TOKEN), "j1");
        let mut loser = EditSession::new(HttpMapApi::new(&base_url, TOKEN), "j1");
        winner.load().await.unwrap();
        loser.load().await.unwrap();

        assert_eq!(
            winner.submit(add_intent(&["c2"])).await.unwrap(),
            EditOutcome::Applied
        );
        assert_eq!(
            loser
                .submit(EditIntent::RemoveContact {
                    trade: "plumbing".to_string(),
                    block: 0,
                    contact_id: "c1".to_string(),
                })
                .await
                .unwrap(),
            EditOutcome::Refreshed
        );

        let loser_snap = loser.view().snapshot().unwrap();
        let winner_snap = winner.view().snapshot().unwrap();
        assert_eq!(loser_snap.ref_token, winner_snap.ref_token);
        assert_eq!(loser_snap.map["plumbing"][0].contacts, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_bad_credential_is_unauthorized() {
        let base_url = spawn_server().await;
        let api = HttpMapApi::new(&base_url, "wrong-token");
        let err = api.fetch_map("j1").await.unwrap_err();
        assert_eq!(err, MapApiError::Unauthorized);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found_over_http() {
        let base_url = spawn_server().await;
        let api = HttpMapApi::new(&base_url, TOKEN);
        let err = api.fetch_map("no-such-job").await.unwrap_err();
        assert!(matches!(err, MapApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_endpoint_feeds_picker() {
        let base_url = spawn_server().await;
        let client = reqwest::Client::new();
        let page: crate::models::contact::ContactPage = client
            .post(format!("{base_url}/jobs/j1/contacts/search"))
            .bearer_auth(TOKEN)
            .json(&serde_json::json!({ "trade": "plumbing", "service_area": "south" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0].id, "c2");
    }
}

