pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod upstream;
pub mod use_cases;
pub mod utils;
pub mod validation;

use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth::NonceStore;
use crate::config::Config;
use crate::domain::ConversionPolicy;
use crate::middleware::{request_logger_middleware, RequestLogSettings};
use crate::ports::{TransactionRepository, WaitlistRepository, WithdrawalRepository};
use crate::services::PriceFeed;
use crate::upstream::{BalanceSource, PaymentVerifier, SignatureVerifier};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: ConversionPolicy,
    pub db: Option<sqlx::PgPool>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub withdrawals: Arc<dyn WithdrawalRepository>,
    pub waitlist: Arc<dyn WaitlistRepository>,
    pub balances: Arc<dyn BalanceSource>,
    pub verifier: Arc<dyn PaymentVerifier>,
    pub signatures: Arc<dyn SignatureVerifier>,
    pub price_feed: PriceFeed,
    pub nonces: NonceStore,
    pub start_time: Instant,
}

pub fn create_app(state: AppState) -> Router {
    let log_settings = RequestLogSettings {
        log_body: state.config.log_request_body,
    };
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/nonce", get(handlers::auth::nonce))
        .route("/complete-siwe", post(handlers::auth::complete_siwe))
        .route("/token-balance", get(handlers::market::token_balance))
        .route("/token-prices", get(handlers::market::token_prices))
        .route("/quote", post(handlers::market::quote))
        .route("/withdrawals", post(handlers::withdrawals::submit_withdrawal))
        .route("/initiate-pay", post(handlers::payments::initiate_pay))
        .route("/verify-payment", post(handlers::payments::verify_payment))
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route("/waitlist", post(handlers::waitlist::join_waitlist))
        .layer(axum::middleware::from_fn_with_state(
            log_settings,
            request_logger_middleware,
        ))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = allowed_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
