use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::contact::{ContactPage, ContactQuery};
use crate::state::AppState;

/// POST /jobs/:job_id/contacts/search
///
/// The job id scopes the request for auth and audit; the directory itself is
/// job-independent.
pub async fn handle_search_contacts(
    State(state): State<AppState>,
    _caller: Caller,
    Path(_job_id): Path<String>,
    Json(query): Json<ContactQuery>,
) -> Result<Json<ContactPage>, AppError> {
    let page = state.directory.search(&query).await?;
    Ok(Json(page))
}
