//! HTTP transport for the contacts-map API.
//!
//! Maps wire statuses onto the client taxonomy: 401/403 -> Unauthorized,
//! 404 -> NotFound, 409 -> Conflict, 400/422 -> Validation. Network errors,
//! timeouts, and 5xx responses are all Transient: the request may simply be
//! retried later against the same ref.

#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

use crate::client::{MapApi, MapApiError};
use crate::models::contact::ContactSummary;
use crate::models::map::{ContactsMap, MapSnapshot, PatchOp};

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct HttpMapApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpMapApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn map_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{job_id}/contacts-map", self.base_url)
    }

    async fn decode_snapshot(response: reqwest::Response) -> Result<MapSnapshot, MapApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(triage(status, &body));
        }
        let envelope: MapEnvelope = response.json().await.map_err(transport_error)?;
        Ok(MapSnapshot {
            map: envelope.map,
            contacts_by_id: envelope.contacts_by_id,
            ref_token: envelope.ref_token,
        })
    }
}

/// Success payload common to GET and PATCH responses; `status` and `job_id`
/// ride along on the wire but carry nothing the snapshot needs.
#[derive(Debug, Deserialize)]
struct MapEnvelope {
    #[serde(rename = "ref")]
    ref_token: String,
    map: ContactsMap,
    #[serde(rename = "contactsById", default)]
    contacts_by_id: BTreeMap<String, ContactSummary>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn triage(status: StatusCode, body: &str) -> MapApiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MapApiError::Unauthorized,
        StatusCode::NOT_FOUND => MapApiError::NotFound(message),
        StatusCode::CONFLICT => MapApiError::Conflict,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            MapApiError::Validation(message)
        }
        _ => MapApiError::Transient(format!("HTTP {status}: {message}")),
    }
}

fn transport_error(err: reqwest::Error) -> MapApiError {
    MapApiError::Transient(err.to_string())
}

#[async_trait]
impl MapApi for HttpMapApi {
    async fn fetch_map(&self, job_id: &str) -> Result<MapSnapshot, MapApiError> {
        debug!(job_id, "fetching contacts map");
        let response = self
            .client
            .get(self.map_url(job_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;
        Self::decode_snapshot(response).await
    }

    async fn apply_ops(
        &self,
        job_id: &str,
        base_ref: &str,
        ops: &[PatchOp],
    ) -> Result<MapSnapshot, MapApiError> {
        debug!(job_id, base_ref, ops = ops.len(), "patching contacts map");
        let response = self
            .client
            .patch(self.map_url(job_id))
            .bearer_auth(&self.token)
            .json(&json!({ "base_ref": base_ref, "ops": ops }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::decode_snapshot(response).await
    }
}
