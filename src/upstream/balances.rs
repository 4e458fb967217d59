use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{guarded, http_client, json_number_text, scale_down, Breaker, BreakerSettings};
use super::{BalanceSource, TokenBalance, UpstreamError};
use crate::domain::Token;

const PORTAL_SERVICE: &str = "dev-portal-balances";
const RPC_SERVICE: &str = "eth-rpc";

#[derive(Debug, Deserialize)]
struct PortalBalances {
    #[serde(default)]
    balances: Vec<PortalBalance>,
}

#[derive(Debug, Deserialize)]
struct PortalBalance {
    token_address: String,
    balance: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

/// ERC-20 balances come from the Developer Portal, native ETH from JSON-RPC.
#[derive(Clone)]
pub struct WalletBalanceClient {
    client: Client,
    dev_portal_url: String,
    app_id: String,
    api_key: String,
    eth_rpc_url: String,
    circuit_breaker: Breaker,
}

impl WalletBalanceClient {
    pub fn new(dev_portal_url: String, app_id: String, api_key: String, eth_rpc_url: String) -> Self {
        Self {
            client: http_client(),
            dev_portal_url,
            app_id,
            api_key,
            eth_rpc_url,
            circuit_breaker: BreakerSettings::default().build(),
        }
    }

    pub fn with_breaker(mut self, settings: BreakerSettings) -> Self {
        self.circuit_breaker = settings.build();
        self
    }

    async fn erc20_balance(
        &self,
        address: &str,
        token: Token,
        contract: &str,
    ) -> Result<TokenBalance, UpstreamError> {
        let url = format!(
            "{}/api/v2/minikit/balances",
            self.dev_portal_url.trim_end_matches('/')
        );
        let request = self
            .client
            .get(&url)
            .query(&[("address", address), ("app_id", self.app_id.as_str())])
            .bearer_auth(&self.api_key);

        let body = guarded(&self.circuit_breaker, PORTAL_SERVICE, async move {
            let response = request.send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Err(UpstreamError::NotFound("wallet balances".to_string()));
            }
            Ok(response.error_for_status()?.json::<PortalBalances>().await?)
        })
        .await?;

        // A token the wallet never held is simply absent.
        let Some(entry) = body
            .balances
            .iter()
            .find(|b| b.token_address.eq_ignore_ascii_case(contract))
        else {
            return Ok(TokenBalance {
                address: address.to_string(),
                token,
                balance: 0.into(),
                raw_balance: "0".to_string(),
            });
        };

        let raw_balance = json_number_text(&entry.balance)
            .ok_or_else(|| UpstreamError::invalid(PORTAL_SERVICE, "balance is not numeric"))?;
        let balance = scale_down(&raw_balance, token.decimals())
            .ok_or_else(|| UpstreamError::invalid(PORTAL_SERVICE, format!("bad balance {}", raw_balance)))?;

        Ok(TokenBalance {
            address: address.to_string(),
            token,
            balance,
            raw_balance,
        })
    }

    async fn eth_balance(&self, address: &str) -> Result<TokenBalance, UpstreamError> {
        let request = self.client.post(&self.eth_rpc_url).json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBalance",
            "params": [address, "latest"],
        }));

        let body = guarded(&self.circuit_breaker, RPC_SERVICE, async move {
            let response = request.send().await?.error_for_status()?;
            Ok(response.json::<RpcResponse>().await?)
        })
        .await?;

        if let Some(error) = body.error {
            return Err(UpstreamError::invalid(RPC_SERVICE, error.message));
        }
        let hex = body
            .result
            .ok_or_else(|| UpstreamError::invalid(RPC_SERVICE, "missing result"))?;
        let digits = hex.trim_start_matches("0x");
        let wei = if digits.is_empty() {
            0
        } else {
            u128::from_str_radix(digits, 16)
                .map_err(|e| UpstreamError::invalid(RPC_SERVICE, format!("bad balance {}: {}", hex, e)))?
        };
        let raw_balance = wei.to_string();
        let balance = scale_down(&raw_balance, Token::Eth.decimals())
            .ok_or_else(|| UpstreamError::invalid(RPC_SERVICE, "bad balance"))?;

        Ok(TokenBalance {
            address: address.to_string(),
            token: Token::Eth,
            balance,
            raw_balance,
        })
    }
}

#[async_trait]
impl BalanceSource for WalletBalanceClient {
    async fn balance(&self, address: &str, token: Token) -> Result<TokenBalance, UpstreamError> {
        match token.contract_address() {
            Some(contract) => self.erc20_balance(address, token, contract).await,
            None => self.eth_balance(address).await,
        }
    }
}
