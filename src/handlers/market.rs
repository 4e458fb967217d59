use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{json_body, parse_token};
use crate::domain::{compute_conversion, PriceTable, Quote};
use crate::error::AppError;
use crate::upstream::TokenBalance;
use crate::validation::{parse_amount, validate_wallet_address, FieldErrors};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub address: Option<String>,
    pub token: Option<String>,
}

pub async fn token_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<TokenBalance>, AppError> {
    let mut errors = FieldErrors::new();
    let address = errors.check(validate_wallet_address(query.address.as_deref().unwrap_or_default()));
    let token = errors.check(parse_token(query.token.as_deref()));
    let (Some(address), Some(token)) = (address, token) else {
        return Err(AppError::Validation(errors));
    };

    let balance = state.balances.balance(&address, token).await?;
    Ok(Json(balance))
}

/// Never fails: the cache always holds either live or fallback prices.
pub async fn token_prices(State(state): State<AppState>) -> Json<PriceTable> {
    Json(state.price_feed.current().await)
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub address: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub amount: Value,
}

pub async fn quote(
    State(state): State<AppState>,
    body: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<Quote>, AppError> {
    let request = json_body(body)?;

    let mut errors = FieldErrors::new();
    let token = errors.check(parse_token(request.token.as_deref()));
    let amount = errors.check(parse_amount(&request.amount));
    let address = match request.address.as_deref().filter(|a| !a.trim().is_empty()) {
        Some(raw) => errors.check(validate_wallet_address(raw)).map(Some),
        None => Some(None),
    };
    let (Some(token), Some(amount), Some(address)) = (token, amount, address) else {
        return Err(AppError::Validation(errors));
    };

    let available = match address {
        Some(address) => Some(state.balances.balance(&address, token).await?.balance),
        None => None,
    };
    let prices = state.price_feed.current().await;
    let quote = compute_conversion(&amount, token, &prices, available.as_ref(), &state.policy)?;

    Ok(Json(quote))
}
