//! HTTP collaborators: price providers, balance providers, the payment
//! verification provider and the wallet-signature verifier.
//!
//! Every client wraps its calls in a `failsafe` circuit breaker. Once the
//! breaker opens, calls fail fast with [`UpstreamError::CircuitBreakerOpen`].

pub mod balances;
#[cfg(feature = "mock-upstream")]
pub mod mock;
pub mod prices;
pub mod siwe;
pub mod verification;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{PriceTable, Token};

pub use balances::WalletBalanceClient;
pub use prices::MarketPriceClient;
pub use siwe::HttpSignatureVerifier;
pub use verification::DevPortalVerifier;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid response from {service}: {message}")]
    InvalidResponse { service: &'static str, message: String },
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

impl UpstreamError {
    pub fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        UpstreamError::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

pub type Breaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

#[derive(Debug, Clone, Copy)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout_secs: 60,
        }
    }
}

impl BreakerSettings {
    pub fn build(&self) -> Breaker {
        let backoff = backoff::equal_jittered(
            Duration::from_secs(self.reset_timeout_secs),
            Duration::from_secs(self.reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(self.failure_threshold, backoff);
        Config::new().failure_policy(policy).build()
    }
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

/// Runs `call` through `breaker`, flattening the failsafe error.
pub(crate) async fn guarded<T, F>(
    breaker: &Breaker,
    service: &'static str,
    call: F,
) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match breaker.call(call).await {
        Ok(value) => Ok(value),
        Err(FailsafeError::Rejected) => Err(UpstreamError::CircuitBreakerOpen(format!(
            "{} circuit breaker is open",
            service
        ))),
        Err(FailsafeError::Inner(e)) => Err(e),
    }
}

/// Turns an integer amount expressed in `decimals` fractional digits into a decimal.
pub(crate) fn scale_down(raw: &str, decimals: u32) -> Option<BigDecimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    BigDecimal::from_str(&format!("{}e-{}", raw, decimals))
        .ok()
        .map(|value| value.normalized())
}

/// Numeric JSON value that may arrive either as a number or a string.
pub(crate) fn json_number_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Current token -> INR prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self) -> Result<PriceTable, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub address: String,
    pub token: Token,
    pub balance: BigDecimal,
    pub raw_balance: String,
}

/// Live wallet balances, one token per call.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance(&self, address: &str, token: Token) -> Result<TokenBalance, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct PaymentLookup<'a> {
    /// Reference the provider must echo back.
    pub intent_id: &'a str,
    /// Transaction id reported by the wallet SDK.
    pub transaction_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderTransaction {
    pub reference: String,
    pub transaction_status: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl ProviderTransaction {
    /// The provider confirmed our intent and did not report a failure.
    pub fn confirms(&self, intent_id: &str) -> bool {
        self.reference == intent_id && self.transaction_status != "failed"
    }
}

/// Authoritative payment status lookup.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn lookup(&self, lookup: PaymentLookup<'_>) -> Result<ProviderTransaction, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiweVerification {
    #[serde(rename = "isValid", alias = "is_valid")]
    pub is_valid: bool,
    #[serde(default)]
    pub address: Option<String>,
}

/// Checks a wallet-auth (SIWE) payload against the nonce it was issued for.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, payload: &Value, nonce: &str) -> Result<SiweVerification, UpstreamError>;
}
