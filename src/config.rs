use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::domain::ConversionPolicy;

pub const DEFAULT_DEV_PORTAL_URL: &str = "https://developer.worldcoin.org";
pub const DEFAULT_WORLD_PRICES_URL: &str = "https://app-backend.worldcoin.dev";
pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub world_app_id: String,
    pub dev_portal_api_key: String,
    pub dev_portal_url: String,
    pub world_prices_url: String,
    pub coingecko_url: String,
    pub eth_rpc_url: String,
    pub siwe_verifier_url: String,
    pub escrow_address: String,
    pub session_secret: String,
    pub nonce_ttl_secs: u64,
    pub min_conversion_amount: BigDecimal,
    pub conversion_fee_percent: BigDecimal,
    pub price_refresh_secs: u64,
    pub signature_timeout_secs: u64,
    pub expiry_sweep_secs: u64,
    /// `None` allows any origin.
    pub cors_allowed_origins: Option<Vec<String>>,
    pub log_request_body: bool,
    pub log_json: bool,
    pub mock_upstream: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Config {
            server_port: parse_or("SERVER_PORT", 3000)?,
            database_url: optional("DATABASE_URL"),
            world_app_id: required("WORLD_APP_ID")?,
            dev_portal_api_key: required("DEV_PORTAL_API_KEY")?,
            dev_portal_url: optional("DEV_PORTAL_URL")
                .unwrap_or_else(|| DEFAULT_DEV_PORTAL_URL.to_string()),
            world_prices_url: optional("WORLD_PRICES_URL")
                .unwrap_or_else(|| DEFAULT_WORLD_PRICES_URL.to_string()),
            coingecko_url: optional("COINGECKO_URL")
                .unwrap_or_else(|| DEFAULT_COINGECKO_URL.to_string()),
            eth_rpc_url: required("ETH_RPC_URL")?,
            siwe_verifier_url: required("SIWE_VERIFIER_URL")?,
            escrow_address: required("ESCROW_ADDRESS")?,
            session_secret: required("SESSION_SECRET")?,
            nonce_ttl_secs: parse_or("NONCE_TTL_SECS", 3600)?,
            min_conversion_amount: parse_or("MIN_CONVERSION_AMOUNT", BigDecimal::from(500))?,
            conversion_fee_percent: parse_or("CONVERSION_FEE_PERCENT", BigDecimal::from(5))?,
            price_refresh_secs: parse_or("PRICE_REFRESH_SECS", 60)?,
            signature_timeout_secs: parse_or("SIGNATURE_TIMEOUT_SECS", 300)?,
            expiry_sweep_secs: parse_or("EXPIRY_SWEEP_SECS", 60)?,
            cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS").map(|raw| parse_origins(&raw)),
            log_request_body: parse_or("LOG_REQUEST_BODY", false)?,
            log_json: optional("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            mock_upstream: parse_or("MOCK_UPSTREAM", false)?,
        })
    }

    pub fn conversion_policy(&self) -> ConversionPolicy {
        ConversionPolicy {
            min_final_amount: self.min_conversion_amount.clone(),
            fee_percent: self.conversion_fee_percent.clone(),
        }
    }

    /// Key/value listing with secrets masked, for the `config` command.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("SERVER_PORT", self.server_port.to_string()),
            (
                "DATABASE_URL",
                self.database_url
                    .as_deref()
                    .map(mask_password)
                    .unwrap_or_else(|| "(in-memory)".to_string()),
            ),
            ("WORLD_APP_ID", self.world_app_id.clone()),
            ("DEV_PORTAL_API_KEY", mask_secret(&self.dev_portal_api_key)),
            ("DEV_PORTAL_URL", self.dev_portal_url.clone()),
            ("WORLD_PRICES_URL", self.world_prices_url.clone()),
            ("COINGECKO_URL", self.coingecko_url.clone()),
            ("ETH_RPC_URL", mask_secret(&self.eth_rpc_url)),
            ("SIWE_VERIFIER_URL", self.siwe_verifier_url.clone()),
            ("ESCROW_ADDRESS", self.escrow_address.clone()),
            ("SESSION_SECRET", mask_secret(&self.session_secret)),
            ("NONCE_TTL_SECS", self.nonce_ttl_secs.to_string()),
            ("MIN_CONVERSION_AMOUNT", self.min_conversion_amount.to_string()),
            ("CONVERSION_FEE_PERCENT", self.conversion_fee_percent.to_string()),
            ("PRICE_REFRESH_SECS", self.price_refresh_secs.to_string()),
            ("SIGNATURE_TIMEOUT_SECS", self.signature_timeout_secs.to_string()),
            ("EXPIRY_SWEEP_SECS", self.expiry_sweep_secs.to_string()),
            (
                "CORS_ALLOWED_ORIGINS",
                self.cors_allowed_origins
                    .as_ref()
                    .map(|origins| origins.join(","))
                    .unwrap_or_else(|| "*".to_string()),
            ),
            ("LOG_REQUEST_BODY", self.log_request_body.to_string()),
            ("LOG_FORMAT", if self.log_json { "json" } else { "text" }.to_string()),
            ("MOCK_UPSTREAM", self.mock_upstream.to_string()),
        ]
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &str) -> Result<String> {
    optional(name).with_context(|| format!("{} must be set", name))
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn mask_secret(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if value.chars().count() <= 8 {
        return "****".to_string();
    }
    format!("{}****", visible)
}

/// Hides the password component of a connection URL.
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_origin_list() {
        assert_eq!(
            parse_origins(" https://a.example , ,https://b.example"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn masks_secrets_but_keeps_prefix() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("sk_live_123456"), "sk_l****");
    }

    #[test]
    fn masks_database_password() {
        assert_eq!(
            mask_password("postgres://app:hunter2@db:5432/instainr"),
            "postgres://app:****@db:5432/instainr"
        );
        assert_eq!(mask_password("postgres://db/instainr"), "postgres://db/instainr");
    }
}
