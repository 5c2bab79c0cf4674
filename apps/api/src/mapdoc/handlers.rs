use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::contact::ContactSummary;
use crate::models::map::{ContactsMap, PatchOp};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PatchOpsRequest {
    pub base_ref: String,
    pub ops: Vec<PatchOp>,
}

#[derive(Deserialize)]
pub struct ReplaceMapRequest {
    pub base_ref: String,
    pub map: ContactsMap,
}

#[derive(Serialize)]
pub struct GetMapResponse {
    pub status: &'static str,
    pub job_id: String,
    #[serde(rename = "ref")]
    pub ref_token: String,
    pub map: ContactsMap,
    #[serde(rename = "contactsById")]
    pub contacts_by_id: BTreeMap<String, ContactSummary>,
}

#[derive(Serialize)]
pub struct PatchMapResponse {
    pub status: &'static str,
    #[serde(rename = "ref")]
    pub ref_token: String,
    pub map: ContactsMap,
    #[serde(rename = "contactsById")]
    pub contacts_by_id: BTreeMap<String, ContactSummary>,
}

#[derive(Serialize)]
pub struct ReplaceMapResponse {
    pub status: &'static str,
    #[serde(rename = "ref")]
    pub ref_token: String,
}

/// GET /jobs/:job_id/contacts-map
pub async fn handle_get_map(
    State(state): State<AppState>,
    _caller: Caller,
    Path(job_id): Path<String>,
) -> Result<Json<GetMapResponse>, AppError> {
    let snap = state.service.get_map(&job_id).await?;
    Ok(Json(GetMapResponse {
        status: "OK",
        job_id,
        ref_token: snap.ref_token,
        map: snap.map,
        contacts_by_id: snap.contacts_by_id,
    }))
}

/// PATCH /jobs/:job_id/contacts-map
pub async fn handle_patch_map(
    State(state): State<AppState>,
    _caller: Caller,
    Path(job_id): Path<String>,
    Json(req): Json<PatchOpsRequest>,
) -> Result<Json<PatchMapResponse>, AppError> {
    let snap = state
        .service
        .patch_map(&job_id, &req.base_ref, &req.ops)
        .await?;
    Ok(Json(PatchMapResponse {
        status: "UPDATED",
        ref_token: snap.ref_token,
        map: snap.map,
        contacts_by_id: snap.contacts_by_id,
    }))
}

/// PUT /jobs/:job_id/contacts-map
pub async fn handle_replace_map(
    State(state): State<AppState>,
    _caller: Caller,
    Path(job_id): Path<String>,
    Json(req): Json<ReplaceMapRequest>,
) -> Result<Json<ReplaceMapResponse>, AppError> {
    let ref_token = state
        .service
        .replace_map(&job_id, &req.base_ref, req.map)
        .await?;
    Ok(Json(ReplaceMapResponse {
        status: "REPLACED",
        ref_token,
    }))
}
