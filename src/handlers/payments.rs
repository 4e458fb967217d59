use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{json_body, parse_token};
use crate::domain::{Quote, Token, TransactionStatus, TransactionView};
use crate::error::AppError;
use crate::use_cases::{InitiatePayment, InitiatePaymentInput, VerifyPayment, VerifyPaymentInput};
use crate::validation::{parse_amount, FieldErrors, ValidationError};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePayRequest {
    #[serde(default)]
    pub address: String,
    pub token: Option<String>,
    #[serde(default)]
    pub amount: Value,
    pub withdrawal_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePayResponse {
    pub id: String,
    pub token: Token,
    pub amount: BigDecimal,
    pub raw_amount: String,
    pub recipient: String,
    pub quote: Quote,
    pub transaction_id: Uuid,
}

pub async fn initiate_pay(
    State(state): State<AppState>,
    body: Result<Json<InitiatePayRequest>, JsonRejection>,
) -> Result<Json<InitiatePayResponse>, AppError> {
    let request = json_body(body)?;

    let mut errors = FieldErrors::new();
    let token = errors.check(parse_token(request.token.as_deref()));
    let amount = errors.check(parse_amount(&request.amount));
    let withdrawal_id = errors.check(
        request
            .withdrawal_id
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| ValidationError::new("withdrawalId", "Withdrawal details are required"))
            .and_then(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ValidationError::new("withdrawalId", "Invalid withdrawal id"))
            }),
    );
    let (Some(token), Some(amount), Some(withdrawal_id)) = (token, amount, withdrawal_id) else {
        return Err(AppError::Validation(errors));
    };

    let use_case = InitiatePayment::new(
        state.transactions.clone(),
        state.withdrawals.clone(),
        state.balances.clone(),
        state.price_feed.clone(),
        state.policy.clone(),
        state.config.escrow_address.clone(),
    );
    let intent = use_case
        .execute(InitiatePaymentInput {
            address: request.address,
            token,
            amount,
            withdrawal_id,
        })
        .await?;

    Ok(Json(InitiatePayResponse {
        id: intent.id,
        token: intent.token,
        amount: intent.amount,
        raw_amount: intent.raw_amount,
        recipient: intent.recipient,
        quote: intent.quote,
        transaction_id: intent.transaction_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "transaction_id", alias = "txHash")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub id: String,
    pub status: TransactionStatus,
    pub transaction_hash: Option<String>,
    pub already_verified: bool,
    pub transaction: TransactionView,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    body: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let request = json_body(body)?;
    if request.status.trim().is_empty() {
        return Err(AppError::BadRequest("Missing payment ID or status".to_string()));
    }

    let use_case = VerifyPayment::new(state.transactions.clone(), state.verifier.clone());
    let outcome = use_case
        .execute(VerifyPaymentInput {
            intent_id: request.id,
            transaction_id: request.transaction_id,
            status: request.status,
        })
        .await?;

    let tx = &outcome.transaction;
    Ok(Json(VerifyPaymentResponse {
        success: true,
        id: tx.transaction_reference.clone(),
        status: tx.status,
        transaction_hash: tx.transaction_hash.clone(),
        already_verified: outcome.already_settled,
        transaction: TransactionView::from(tx),
    }))
}
