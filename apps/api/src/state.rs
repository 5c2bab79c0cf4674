use std::sync::Arc;

use crate::config::Config;
use crate::directory::ContactDirectory;
use crate::mapdoc::service::MapService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub service: MapService,
    /// Directory seam for the contact picker. In-memory and JSON-seeded by
    /// default; swap for the real directory client at startup.
    pub directory: Arc<dyn ContactDirectory>,
    pub config: Config,
}
