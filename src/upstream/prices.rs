use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use super::{guarded, http_client, json_number_text, scale_down, Breaker, BreakerSettings};
use super::{PriceSource, UpstreamError};
use crate::domain::{PriceTable, Token};

const WORLD_SERVICE: &str = "world-prices";
const COINGECKO_SERVICE: &str = "coingecko";

#[derive(Debug, Deserialize)]
struct WorldPricesResponse {
    result: WorldPricesResult,
}

#[derive(Debug, Deserialize)]
struct WorldPricesResult {
    prices: HashMap<String, HashMap<String, FiatAmount>>,
}

#[derive(Debug, Deserialize)]
struct FiatAmount {
    amount: Value,
    decimals: u32,
}

/// World App public pricing for WLD and USDC.e, CoinGecko for ETH.
#[derive(Clone)]
pub struct MarketPriceClient {
    client: Client,
    world_prices_url: String,
    coingecko_url: String,
    world_breaker: Breaker,
    coingecko_breaker: Breaker,
}

impl MarketPriceClient {
    pub fn new(world_prices_url: String, coingecko_url: String) -> Self {
        Self {
            client: http_client(),
            world_prices_url,
            coingecko_url,
            world_breaker: BreakerSettings::default().build(),
            coingecko_breaker: BreakerSettings::default().build(),
        }
    }

    /// Same settings for both providers; each keeps its own breaker.
    pub fn with_breaker(mut self, settings: BreakerSettings) -> Self {
        self.world_breaker = settings.build();
        self.coingecko_breaker = settings.build();
        self
    }

    async fn world_prices(&self) -> Result<BTreeMap<Token, BigDecimal>, UpstreamError> {
        let url = format!(
            "{}/public/v1/miniapps/prices?cryptoCurrencies=WLD,USDCE&fiatCurrencies=USD,INR",
            self.world_prices_url.trim_end_matches('/')
        );
        let client = self.client.clone();

        let body = guarded(&self.world_breaker, WORLD_SERVICE, async move {
            let response = client.get(&url).send().await?.error_for_status()?;
            Ok(response.json::<WorldPricesResponse>().await?)
        })
        .await?;

        let mut prices = BTreeMap::new();
        for (token, key) in [(Token::Wld, "WLD"), (Token::UsdcE, "USDCE")] {
            let inr = body
                .result
                .prices
                .get(key)
                .and_then(|fiat| fiat.get("INR"))
                .ok_or_else(|| UpstreamError::invalid(WORLD_SERVICE, format!("missing INR price for {}", key)))?;
            let price = json_number_text(&inr.amount)
                .and_then(|raw| scale_down(&raw, inr.decimals))
                .ok_or_else(|| UpstreamError::invalid(WORLD_SERVICE, format!("bad INR amount for {}", key)))?;
            prices.insert(token, price);
        }

        Ok(prices)
    }

    async fn eth_price(&self) -> Result<BigDecimal, UpstreamError> {
        let url = format!(
            "{}/api/v3/simple/price?ids=ethereum&vs_currencies=inr",
            self.coingecko_url.trim_end_matches('/')
        );
        let client = self.client.clone();

        let body = guarded(&self.coingecko_breaker, COINGECKO_SERVICE, async move {
            let response = client.get(&url).send().await?.error_for_status()?;
            Ok(response.json::<Value>().await?)
        })
        .await?;

        json_number_text(&body["ethereum"]["inr"])
            .and_then(|raw| BigDecimal::from_str(&raw).ok())
            .ok_or_else(|| UpstreamError::invalid(COINGECKO_SERVICE, "missing ethereum.inr"))
    }
}

#[async_trait]
impl PriceSource for MarketPriceClient {
    /// Both providers must answer; a partial table is never returned.
    async fn fetch_prices(&self) -> Result<PriceTable, UpstreamError> {
        let (world, eth) = tokio::join!(self.world_prices(), self.eth_price());
        let mut prices = world?;
        prices.insert(Token::Eth, eth?);

        tracing::debug!(?prices, "Fetched token prices in INR");
        Ok(PriceTable::new(prices))
    }
}
