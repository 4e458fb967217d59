use clap::{Parser, Subcommand};
use sqlx::PgPool;
use std::time::Duration;

use crate::adapters::PostgresTransactionRepository;
use crate::config::Config;
use crate::ports::TransactionRepository;
use crate::services::sweep_once;

#[derive(Parser)]
#[command(name = "instainr-core")]
#[command(about = "InstaINR Core - crypto to INR conversion gateway", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Conversion record commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Print the resolved configuration and run startup validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Fail pending records whose signature window has passed
    ExpireStale,

    /// List conversion records for a wallet, newest first
    List {
        /// Wallet address (0x-prefixed)
        #[arg(short, long)]
        address: String,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for this command"))?;
    Ok(crate::db::create_pool(url).await?)
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub async fn handle_config(config: &Config) -> anyhow::Result<()> {
    println!("Configuration:");
    for (name, value) in config.describe() {
        println!("  {:<24} {}", name, value);
    }

    let pool = match &config.database_url {
        Some(url) => match crate::db::create_pool(url).await {
            Ok(pool) => Some(pool),
            Err(e) => {
                println!("✗ Could not connect to database: {}", e);
                None
            }
        },
        None => None,
    };

    let report = crate::startup::validate_environment(config, pool.as_ref()).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }
    Ok(())
}

pub async fn handle_tx_expire_stale(config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let repo = PostgresTransactionRepository::new(pool);

    let expired = sweep_once(&repo, Duration::from_secs(config.signature_timeout_secs)).await?;

    tracing::info!(expired, "Expired stale pending records");
    println!("✓ {} pending record(s) expired", expired);
    Ok(())
}

pub async fn handle_tx_list(config: &Config, address: &str) -> anyhow::Result<()> {
    let address = crate::validation::validate_wallet_address(address)
        .map_err(|e| anyhow::anyhow!("{}", e.message))?;

    let pool = connect(config).await?;
    let repo = PostgresTransactionRepository::new(pool);
    let records = repo.list_by_wallet(&address).await?;

    if records.is_empty() {
        println!("No transactions found for {}", address);
        return Ok(());
    }

    println!(
        "{:<36} {:<8} {:>14} {:>12} {:<10} {:<20}",
        "ID", "Token", "Amount", "INR", "Status", "Created"
    );
    println!("{}", "-".repeat(105));

    for record in &records {
        println!(
            "{:<36} {:<8} {:>14} {:>12} {:<10} {:<20}",
            record.id.to_string(),
            record.token.symbol(),
            record.amount,
            record.final_amount,
            record.status.as_str(),
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["instainr-core"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_tx_list_address() {
        let cli = Cli::try_parse_from(["instainr-core", "tx", "list", "--address", "0xabc"]).unwrap();
        match cli.command {
            Some(Commands::Tx(TxCommands::List { address })) => assert_eq!(address, "0xabc"),
            _ => panic!("expected tx list"),
        }
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["instainr-core", "backup", "run"]).is_err());
    }
}
