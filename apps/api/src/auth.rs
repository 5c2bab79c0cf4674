use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::AppError;
use crate::state::AppState;

/// Extractor that rejects requests without a valid `Authorization: Bearer`
/// credential. Token issuance lives in the identity service; this API only
/// checks the presented token against its configured credential.
pub struct Caller;

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
        if token.trim().is_empty() || token != state.config.api_token {
            return Err(AppError::Unauthorized);
        }
        Ok(Caller)
    }
}
