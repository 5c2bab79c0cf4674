//! Editing client for the contacts map.
//!
//! `EditSession` (state machine + conflict recovery) talks to the document
//! service through the `MapApi` seam. Production uses the HTTP transport in
//! `http`; tests drive the same session code against the in-process service.

pub mod compiler;
pub mod http;
pub mod session;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::map::{MapSnapshot, PatchOp};

/// Failure taxonomy for map reads and mutations, as seen by the client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapApiError {
    #[error("no contacts map for job '{0}'")]
    NotFound(String),

    #[error("credential rejected")]
    Unauthorized,

    #[error("map changed since it was last fetched")]
    Conflict,

    #[error("patch rejected: {0}")]
    Validation(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

/// Transport seam for the contacts-map service. Both calls return the full
/// resulting document, never a diff: the client re-synchronizes wholesale
/// after every successful round-trip.
#[async_trait]
pub trait MapApi: Send + Sync {
    async fn fetch_map(&self, job_id: &str) -> Result<MapSnapshot, MapApiError>;

    /// Applies `ops` atomically against `base_ref`. `Conflict` means another
    /// writer advanced the ref first; `Validation` means at least one op no
    /// longer makes sense against the current document.
    async fn apply_ops(
        &self,
        job_id: &str,
        base_ref: &str,
        ops: &[PatchOp],
    ) -> Result<MapSnapshot, MapApiError>;
}
