//! Edit session state machine for one job's contacts map.
//!
//! The view only ever holds server-confirmed state: a successful mutation
//! replaces it wholesale with the returned snapshot, and nothing is applied
//! locally ahead of confirmation. The one piece of ephemeral local state is
//! the `busy` flag, which callers use to freeze edit affordances while a
//! round-trip is outstanding so two patches never race from the same view.
//!
//! Conflict handling: a rejected ref means another writer got there first.
//! The losing patch is discarded, never replayed, and the session reloads
//! canonical state; the caller learns the edit did not apply via
//! `EditOutcome::Refreshed`.

#![allow(dead_code)]

use tracing::{debug, warn};

use crate::client::compiler::{compile, CompileError, EditIntent};
use crate::client::{MapApi, MapApiError};
use crate::models::map::MapSnapshot;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum MapView {
    Unloaded,
    Loading,
    Ready(MapSnapshot),
}

impl MapView {
    pub fn snapshot(&self) -> Option<&MapSnapshot> {
        match self {
            MapView::Ready(snap) => Some(snap),
            _ => None,
        }
    }
}

/// How a submitted edit ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditOutcome {
    /// The patch landed; the view now holds the resulting document.
    Applied,
    /// Another writer advanced the document first. The patch was discarded
    /// and the view refreshed to canonical state.
    Refreshed,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("no map loaded for this session")]
    NotLoaded,

    #[error("a request is already in flight")]
    Busy,

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Api(#[from] MapApiError),
}

pub struct EditSession<A: MapApi> {
    api: A,
    job_id: String,
    view: MapView,
    busy: bool,
}

impl<A: MapApi> EditSession<A> {
    pub fn new(api: A, job_id: impl Into<String>) -> Self {
        Self {
            api,
            job_id: job_id.into(),
            view: MapView::Unloaded,
            busy: false,
        }
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// True while a round-trip is outstanding; edit affordances must be
    /// disabled for the duration.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Fetches the full current document, replacing whatever the session held.
    pub async fn load(&mut self) -> Result<&MapSnapshot, MapApiError> {
        self.view = MapView::Loading;
        self.busy = true;
        let result = self.api.fetch_map(&self.job_id).await;
        self.busy = false;
        match result {
            Ok(snap) => {
                self.view = MapView::Ready(snap);
                Ok(self.view.snapshot().expect("view just set to Ready"))
            }
            Err(e) => {
                self.view = MapView::Unloaded;
                Err(e)
            }
        }
    }

    /// Compiles `intent` against the current view and submits it as one
    /// atomic patch with the last-known ref.
    ///
    /// On `Conflict` the patch is dropped (the intent may no longer be valid
    /// against the winner's document) and the view is refetched. Any other
    /// failure leaves the view untouched and propagates.
    pub async fn submit(&mut self, intent: EditIntent) -> Result<EditOutcome, EditError> {
        if self.busy {
            return Err(EditError::Busy);
        }
        let (base_ref, ops) = match &self.view {
            MapView::Ready(snap) => (snap.ref_token.clone(), compile(&intent, &snap.map)?),
            _ => return Err(EditError::NotLoaded),
        };

        self.busy = true;
        let result = self.api.apply_ops(&self.job_id, &base_ref, &ops).await;
        self.busy = false;

        match result {
            Ok(snap) => {
                debug!(job_id = %self.job_id, new_ref = %snap.ref_token, "edit applied");
                self.view = MapView::Ready(snap);
                Ok(EditOutcome::Applied)
            }
            Err(MapApiError::Conflict) => {
                warn!(job_id = %self.job_id, "edit lost to a concurrent writer; refreshing");
                self.load().await?;
                Ok(EditOutcome::Refreshed)
            }
            Err(e) => Err(e.into()),
        }
    }
}
