use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::json_body;
use crate::auth::{check_nonce, nonce_cookie};
use crate::error::AppError;
use crate::AppState;

pub async fn nonce(State(state): State<AppState>) -> impl IntoResponse {
    let nonce = state.nonces.issue().await;
    let cookie = nonce_cookie(&state.config.session_secret, &nonce, state.nonces.ttl());

    ([(header::SET_COOKIE, cookie)], Json(json!({ "nonce": nonce })))
}

#[derive(Debug, Deserialize)]
pub struct CompleteSiweRequest {
    pub payload: Value,
    #[serde(default)]
    pub nonce: String,
}

pub async fn complete_siwe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CompleteSiweRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = json_body(body)?;

    if let Err(e) = check_nonce(
        &state.nonces,
        &state.config.session_secret,
        &headers,
        &request.nonce,
    )
    .await
    {
        tracing::warn!(error = %e, "Wallet auth rejected");
        return Err(e.into());
    }

    let verification = state.signatures.verify(&request.payload, &request.nonce).await?;
    if !verification.is_valid {
        return Err(AppError::Unauthorized("Invalid SIWE message".to_string()));
    }

    tracing::info!(address = ?verification.address, "Wallet authenticated");
    Ok(Json(json!({
        "status": "success",
        "isValid": true,
        "address": verification.address,
    })))
}
