#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;

use instainr_core::adapters::InMemoryStore;
use instainr_core::config::Config;
use instainr_core::domain::{PriceTable, Token};
use instainr_core::startup::{assemble_state, Stores, Upstreams};
use instainr_core::upstream::{
    BalanceSource, PaymentLookup, PaymentVerifier, PriceSource, ProviderTransaction,
    SignatureVerifier, SiweVerification, TokenBalance, UpstreamError,
};
use instainr_core::{create_app, AppState};

pub const SESSION_SECRET: &str = "test-session-secret-0123456789abcdef";
pub const ESCROW: &str = "0x00000000000000000000000000000000000000e5";
pub const WALLET: &str = "0x1111111111111111111111111111111111111111";
pub const OTHER_WALLET: &str = "0x2222222222222222222222222222222222222222";

pub fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub fn test_config() -> Config {
    Config {
        server_port: 3000,
        database_url: None,
        world_app_id: "app_test".to_string(),
        dev_portal_api_key: "api_key_test".to_string(),
        dev_portal_url: "http://127.0.0.1:9".to_string(),
        world_prices_url: "http://127.0.0.1:9".to_string(),
        coingecko_url: "http://127.0.0.1:9".to_string(),
        eth_rpc_url: "http://127.0.0.1:9".to_string(),
        siwe_verifier_url: "http://127.0.0.1:9".to_string(),
        escrow_address: ESCROW.to_string(),
        session_secret: SESSION_SECRET.to_string(),
        nonce_ttl_secs: 3600,
        min_conversion_amount: BigDecimal::from(500),
        conversion_fee_percent: BigDecimal::from(5),
        price_refresh_secs: 60,
        signature_timeout_secs: 300,
        expiry_sweep_secs: 60,
        cors_allowed_origins: None,
        log_request_body: false,
        log_json: false,
        mock_upstream: false,
    }
}

/// WLD 75.25, USDC.e 82.86, ETH 223450.75.
pub struct FixedPrices;

#[async_trait]
impl PriceSource for FixedPrices {
    async fn fetch_prices(&self) -> Result<PriceTable, UpstreamError> {
        let mut prices = BTreeMap::new();
        prices.insert(Token::Wld, dec("75.25"));
        prices.insert(Token::UsdcE, dec("82.86"));
        prices.insert(Token::Eth, dec("223450.75"));
        Ok(PriceTable::new(prices))
    }
}

pub struct DownPrices;

#[async_trait]
impl PriceSource for DownPrices {
    async fn fetch_prices(&self) -> Result<PriceTable, UpstreamError> {
        Err(UpstreamError::CircuitBreakerOpen("world-prices".to_string()))
    }
}

/// Same balance for every token.
pub struct FixedBalance(pub BigDecimal);

#[async_trait]
impl BalanceSource for FixedBalance {
    async fn balance(&self, address: &str, token: Token) -> Result<TokenBalance, UpstreamError> {
        Ok(TokenBalance {
            address: address.to_string(),
            token,
            balance: self.0.clone(),
            raw_balance: "0".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ProviderScript {
    Mined,
    Failed,
    Unreachable,
    Unknown,
}

pub struct ScriptedVerifier(pub ProviderScript);

#[async_trait]
impl PaymentVerifier for ScriptedVerifier {
    async fn lookup(&self, lookup: PaymentLookup<'_>) -> Result<ProviderTransaction, UpstreamError> {
        let status = match self.0 {
            ProviderScript::Mined => "mined",
            ProviderScript::Failed => "failed",
            ProviderScript::Unreachable => {
                return Err(UpstreamError::CircuitBreakerOpen("dev-portal".to_string()))
            }
            ProviderScript::Unknown => {
                return Err(UpstreamError::NotFound(lookup.transaction_id.to_string()))
            }
        };
        Ok(ProviderTransaction {
            reference: lookup.intent_id.to_string(),
            transaction_status: status.to_string(),
            transaction_hash: Some(format!("0xhash-{}", lookup.transaction_id)),
        })
    }
}

/// Valid when the payload carries `"signature": "good"`.
pub struct FakeSiwe;

#[async_trait]
impl SignatureVerifier for FakeSiwe {
    async fn verify(&self, payload: &Value, _nonce: &str) -> Result<SiweVerification, UpstreamError> {
        Ok(SiweVerification {
            is_valid: payload["signature"] == "good",
            address: payload["address"].as_str().map(str::to_string),
        })
    }
}

pub struct TestAppBuilder {
    prices: Arc<dyn PriceSource>,
    balance: BigDecimal,
    provider: ProviderScript,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            prices: Arc::new(FixedPrices),
            balance: dec("100"),
            provider: ProviderScript::Mined,
        }
    }
}

impl TestAppBuilder {
    pub fn prices(mut self, prices: impl PriceSource + 'static) -> Self {
        self.prices = Arc::new(prices);
        self
    }

    pub fn balance(mut self, balance: &str) -> Self {
        self.balance = dec(balance);
        self
    }

    pub fn provider(mut self, script: ProviderScript) -> Self {
        self.provider = script;
        self
    }

    pub async fn spawn(self) -> TestApp {
        let store = Arc::new(InMemoryStore::new());
        let stores = Stores {
            db: None,
            transactions: store.clone(),
            withdrawals: store.clone(),
            waitlist: store,
        };
        let upstreams = Upstreams {
            prices: self.prices,
            balances: Arc::new(FixedBalance(self.balance)),
            verifier: Arc::new(ScriptedVerifier(self.provider)),
            signatures: Arc::new(FakeSiwe),
        };

        let state = assemble_state(test_config(), stores, upstreams);
        state.price_feed.refresh().await;

        let app = create_app(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestApp {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            state,
        }
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

impl TestApp {
    pub async fn spawn() -> Self {
        TestAppBuilder::default().spawn().await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post(&self, path: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// Submits a valid UPI withdrawal for `address` and returns its id.
    pub async fn withdrawal_for(&self, address: &str) -> String {
        let (status, body) = self
            .post(
                "/withdrawals",
                serde_json::json!({
                    "address": address,
                    "withdrawalMethod": "upi",
                    "methodDetails": { "upiId": "asha@okaxis" },
                    "verificationMethod": "pan",
                    "verificationNumber": "ABCDE1234F"
                }),
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Opens a 10 WLD payment intent and returns its id.
    pub async fn intent_for(&self, address: &str) -> String {
        let withdrawal_id = self.withdrawal_for(address).await;
        let (status, body) = self
            .post(
                "/initiate-pay",
                serde_json::json!({
                    "address": address,
                    "token": "WLD",
                    "amount": "10",
                    "withdrawalId": withdrawal_id
                }),
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::OK, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}
