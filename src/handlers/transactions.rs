use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{json_body, parse_token};
use crate::domain::TransactionView;
use crate::error::AppError;
use crate::use_cases::{RecordTransaction, RecordTransactionInput};
use crate::validation::{parse_amount, validate_wallet_address, FieldErrors, WithdrawalInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub address: Option<String>,
}

/// Newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let address = validate_wallet_address(query.address.as_deref().unwrap_or_default())?;
    let transactions: Vec<TransactionView> = state
        .transactions
        .list_by_wallet(&address)
        .await?
        .iter()
        .map(TransactionView::from)
        .collect();

    Ok(Json(json!({ "transactions": transactions })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub address: String,
    pub token: Option<String>,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub transaction_reference: String,
    #[serde(flatten)]
    pub withdrawal: WithdrawalInput,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    body: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionView>), AppError> {
    let request = json_body(body)?;

    let mut errors = FieldErrors::new();
    let token = errors.check(parse_token(request.token.as_deref()));
    let amount = errors.check(parse_amount(&request.amount));
    let (Some(token), Some(amount)) = (token, amount) else {
        return Err(AppError::Validation(errors));
    };

    let use_case = RecordTransaction::new(
        state.transactions.clone(),
        state.price_feed.clone(),
        state.policy.clone(),
    );
    let stored = use_case
        .execute(RecordTransactionInput {
            address: request.address,
            token,
            amount,
            transaction_reference: request.transaction_reference,
            withdrawal: request.withdrawal,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TransactionView::from(&stored))))
}
