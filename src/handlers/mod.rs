pub mod auth;
pub mod market;
pub mod payments;
pub mod transactions;
pub mod waitlist;
pub mod withdrawals;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::domain::Token;
use crate::error::AppError;
use crate::health::{check_health, DependencyChecker, PostgresChecker, PriceFeedChecker};
use crate::validation::ValidationError;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut checkers: Vec<Box<dyn DependencyChecker>> =
        vec![Box::new(PriceFeedChecker::new(state.price_feed.clone()))];
    if let Some(pool) = &state.db {
        checkers.push(Box::new(PostgresChecker::new(pool.clone())));
    }

    let report = check_health(&checkers, state.start_time).await;
    let status_code = if report.status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(report))
}

/// Unwraps a JSON body, turning axum's rejection into our error shape.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text())))
}

pub(crate) fn parse_token(raw: Option<&str>) -> Result<Token, ValidationError> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty());
    let Some(raw) = raw else {
        return Err(ValidationError::new("token", "Token is required"));
    };
    raw.parse()
        .map_err(|_| ValidationError::new("token", "Unsupported token"))
}
