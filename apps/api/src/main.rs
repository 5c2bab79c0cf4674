mod auth;
mod client;
mod config;
mod directory;
mod errors;
mod mapdoc;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::directory::{ContactDirectory, InMemoryDirectory};
use crate::mapdoc::service::MapService;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::fs::FsMapStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Foreman API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the versioned map store
    let store = Arc::new(FsMapStore::new(&config.storage_root)?);
    info!("Map store rooted at {}", config.storage_root.display());

    // Seed maps for jobs that do not have one yet
    if let Some(dir) = &config.seed_jobs_dir {
        seed_jobs(&store, dir).await?;
    }

    // Initialize the contact directory
    let directory: Arc<dyn ContactDirectory> = match &config.contacts_path {
        Some(path) => {
            let dir = InMemoryDirectory::from_json_file(path)?;
            info!("Loaded {} contacts from {}", dir.len(), path.display());
            Arc::new(dir)
        }
        None => {
            info!("CONTACTS_PATH not set; contact directory starts empty");
            Arc::new(InMemoryDirectory::default())
        }
    };

    // Build app state
    let service = MapService::new(store, directory.clone());
    let state = AppState {
        service,
        directory,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads every `<job_id>.json` under `dir` into the store, skipping jobs
/// that already have a map.
async fn seed_jobs(store: &FsMapStore, dir: &std::path::Path) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(job_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let ref_token = store::fs::seed_job_from_file(store, job_id, &path).await?;
        info!("Seeded job '{job_id}' at ref {ref_token}");
    }
    Ok(())
}
