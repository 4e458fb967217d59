use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::json_body;
use crate::error::AppError;
use crate::validation::validate_email;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WaitlistRequest {
    #[serde(default)]
    pub email: String,
}

pub async fn join_waitlist(
    State(state): State<AppState>,
    body: Result<Json<WaitlistRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let email = validate_email(&json_body(body)?.email)?;
    let added = state.waitlist.add(&email).await?;

    if added {
        tracing::info!("Waitlist signup recorded");
    }
    Ok(Json(json!({ "success": true, "alreadyRegistered": !added })))
}
