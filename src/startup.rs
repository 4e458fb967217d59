use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::{
    InMemoryStore, PostgresTransactionRepository, PostgresWaitlistRepository,
    PostgresWithdrawalRepository,
};
use crate::auth::NonceStore;
use crate::config::Config;
use crate::ports::{TransactionRepository, WaitlistRepository, WithdrawalRepository};
use crate::services::{run_expiry_sweeper, PriceFeed};
use crate::upstream::{
    BalanceSource, DevPortalVerifier, HttpSignatureVerifier, MarketPriceClient, PaymentVerifier,
    PriceSource, SignatureVerifier, WalletBalanceClient,
};
use crate::AppState;

pub struct ValidationReport {
    pub environment: bool,
    pub database: Option<bool>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.database.unwrap_or(true)
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        match self.database {
            Some(ok) => println!("Database Connectivity: {}", status(ok)),
            None => println!("Database Connectivity: - (in-memory store)"),
        }

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  ❌ {}", error);
            }
        }

        println!("\nOverall Status: {}", if self.is_valid() { "✅ PASS" } else { "❌ FAIL" });
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "✅ OK" } else { "❌ FAIL" }
}

pub async fn validate_environment(config: &Config, pool: Option<&PgPool>) -> ValidationReport {
    let mut report = ValidationReport {
        environment: true,
        database: None,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {:#}", e));
    }

    if let Some(pool) = pool {
        let ok = match validate_database(pool).await {
            Ok(()) => true,
            Err(e) => {
                report.errors.push(format!("Database: {:#}", e));
                false
            }
        };
        report.database = Some(ok);
    }

    report
}

pub fn validate_env_vars(config: &Config) -> Result<()> {
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }

    for (name, value) in [
        ("DEV_PORTAL_URL", &config.dev_portal_url),
        ("WORLD_PRICES_URL", &config.world_prices_url),
        ("COINGECKO_URL", &config.coingecko_url),
        ("ETH_RPC_URL", &config.eth_rpc_url),
        ("SIWE_VERIFIER_URL", &config.siwe_verifier_url),
    ] {
        url::Url::parse(value).with_context(|| format!("{} is not a valid URL", name))?;
    }

    crate::validation::validate_wallet_address(&config.escrow_address)
        .map_err(|e| anyhow::anyhow!("ESCROW_ADDRESS: {}", e.message))?;

    if config.session_secret.len() < 32 {
        anyhow::bail!("SESSION_SECRET must be at least 32 bytes");
    }
    if config.conversion_fee_percent < 0.into() || config.conversion_fee_percent >= 100.into() {
        anyhow::bail!("CONVERSION_FEE_PERCENT must be in [0, 100)");
    }
    if config.mock_upstream && !cfg!(feature = "mock-upstream") {
        anyhow::bail!("MOCK_UPSTREAM requires a build with the mock-upstream feature");
    }

    Ok(())
}

async fn validate_database(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Failed to connect to database")?;

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .context("Failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("No migrations applied");
    }

    Ok(())
}

pub struct Stores {
    pub db: Option<PgPool>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub withdrawals: Arc<dyn WithdrawalRepository>,
    pub waitlist: Arc<dyn WaitlistRepository>,
}

/// Postgres when `DATABASE_URL` is set (migrations applied), otherwise one
/// shared in-memory store.
pub async fn connect_stores(config: &Config) -> Result<Stores> {
    match &config.database_url {
        Some(url) => {
            let pool = crate::db::create_pool(url)
                .await
                .context("Failed to connect to database")?;
            crate::db::run_migrations(&pool).await?;

            Ok(Stores {
                db: Some(pool.clone()),
                transactions: Arc::new(PostgresTransactionRepository::new(pool.clone())),
                withdrawals: Arc::new(PostgresWithdrawalRepository::new(pool.clone())),
                waitlist: Arc::new(PostgresWaitlistRepository::new(pool)),
            })
        }
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory only");
            let store = Arc::new(InMemoryStore::new());
            Ok(Stores {
                db: None,
                transactions: store.clone(),
                withdrawals: store.clone(),
                waitlist: store,
            })
        }
    }
}

pub struct Upstreams {
    pub prices: Arc<dyn PriceSource>,
    pub balances: Arc<dyn BalanceSource>,
    pub verifier: Arc<dyn PaymentVerifier>,
    pub signatures: Arc<dyn SignatureVerifier>,
}

fn http_upstreams(config: &Config) -> Upstreams {
    Upstreams {
        prices: Arc::new(MarketPriceClient::new(
            config.world_prices_url.clone(),
            config.coingecko_url.clone(),
        )),
        balances: Arc::new(WalletBalanceClient::new(
            config.dev_portal_url.clone(),
            config.world_app_id.clone(),
            config.dev_portal_api_key.clone(),
            config.eth_rpc_url.clone(),
        )),
        verifier: Arc::new(DevPortalVerifier::new(
            config.dev_portal_url.clone(),
            config.world_app_id.clone(),
            config.dev_portal_api_key.clone(),
        )),
        signatures: Arc::new(HttpSignatureVerifier::new(config.siwe_verifier_url.clone())),
    }
}

#[cfg(feature = "mock-upstream")]
fn mock_upstreams() -> Upstreams {
    use crate::upstream::mock::{
        MockBalanceSource, MockPaymentVerifier, MockPriceSource, MockSignatureVerifier,
    };

    Upstreams {
        prices: Arc::new(MockPriceSource),
        balances: Arc::new(MockBalanceSource),
        verifier: Arc::new(MockPaymentVerifier),
        signatures: Arc::new(MockSignatureVerifier),
    }
}

pub fn select_upstreams(config: &Config) -> Result<Upstreams> {
    if config.mock_upstream {
        #[cfg(feature = "mock-upstream")]
        {
            tracing::warn!("MOCK_UPSTREAM enabled: prices, balances and verification are canned");
            return Ok(mock_upstreams());
        }
        #[cfg(not(feature = "mock-upstream"))]
        anyhow::bail!("MOCK_UPSTREAM requires a build with the mock-upstream feature");
    }
    Ok(http_upstreams(config))
}

pub fn assemble_state(config: Config, stores: Stores, upstreams: Upstreams) -> AppState {
    let nonces = NonceStore::new(Duration::from_secs(config.nonce_ttl_secs));
    AppState {
        policy: config.conversion_policy(),
        config: Arc::new(config),
        db: stores.db,
        transactions: stores.transactions,
        withdrawals: stores.withdrawals,
        waitlist: stores.waitlist,
        balances: upstreams.balances,
        verifier: upstreams.verifier,
        signatures: upstreams.signatures,
        price_feed: PriceFeed::new(upstreams.prices),
        nonces,
        start_time: Instant::now(),
    }
}

pub async fn build_state(config: Config) -> Result<AppState> {
    validate_env_vars(&config)?;
    let upstreams = select_upstreams(&config)?;
    let stores = connect_stores(&config).await?;
    Ok(assemble_state(config, stores, upstreams))
}

/// Price refresh loop and signature-expiry sweeper.
pub fn spawn_background_tasks(state: &AppState) {
    state
        .price_feed
        .start(Duration::from_secs(state.config.price_refresh_secs));

    tokio::spawn(run_expiry_sweeper(
        state.transactions.clone(),
        Duration::from_secs(state.config.signature_timeout_secs),
        Duration::from_secs(state.config.expiry_sweep_secs),
    ));
}
