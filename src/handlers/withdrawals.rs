use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::json_body;
use crate::error::AppError;
use crate::use_cases::SubmitWithdrawal;
use crate::validation::WithdrawalInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitWithdrawalRequest {
    #[serde(default)]
    pub address: String,
    #[serde(flatten)]
    pub withdrawal: WithdrawalInput,
}

pub async fn submit_withdrawal(
    State(state): State<AppState>,
    body: Result<Json<SubmitWithdrawalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request = json_body(body)?;

    let request = SubmitWithdrawal::new(state.withdrawals.clone())
        .execute(&request.address, &request.withdrawal)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": request.id,
            "status": request.status,
            "withdrawalMethod": request.details.method(),
            "details": request.details.masked(),
        })),
    ))
}
