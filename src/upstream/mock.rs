//! Canned upstream responses for local demos. Compiled only with the
//! `mock-upstream` feature.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::{
    BalanceSource, PaymentLookup, PaymentVerifier, PriceSource, ProviderTransaction,
    SignatureVerifier, SiweVerification, TokenBalance, UpstreamError,
};
use crate::domain::{PriceTable, Token};

const MOCK_PRICES: [(Token, &str); 3] = [
    (Token::Wld, "75.25"),
    (Token::UsdcE, "82.86"),
    (Token::Eth, "223450.75"),
];

const MOCK_BALANCES: [(Token, &str); 3] = [
    (Token::Wld, "10.5"),
    (Token::UsdcE, "25.0"),
    (Token::Eth, "0.15"),
];

fn lookup_canned(table: &[(Token, &str); 3], token: Token) -> Result<BigDecimal, UpstreamError> {
    table
        .iter()
        .find(|(t, _)| *t == token)
        .and_then(|(_, value)| BigDecimal::from_str(value).ok())
        .ok_or_else(|| UpstreamError::invalid("mock", format!("no canned value for {}", token)))
}

#[derive(Debug, Clone, Default)]
pub struct MockPriceSource;

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_prices(&self) -> Result<PriceTable, UpstreamError> {
        let mut prices = BTreeMap::new();
        for token in Token::ALL {
            prices.insert(token, lookup_canned(&MOCK_PRICES, token)?);
        }
        Ok(PriceTable::new(prices))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBalanceSource;

#[async_trait]
impl BalanceSource for MockBalanceSource {
    async fn balance(&self, address: &str, token: Token) -> Result<TokenBalance, UpstreamError> {
        let balance = lookup_canned(&MOCK_BALANCES, token)?;
        let raw = BigDecimal::from_str(&format!("{}e{}", balance, token.decimals()))
            .map_err(|e| UpstreamError::invalid("mock", e.to_string()))?;

        Ok(TokenBalance {
            address: address.to_string(),
            token,
            raw_balance: raw.with_scale(0).to_string(),
            balance,
        })
    }
}

/// Confirms every payment by echoing the expected reference.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentVerifier;

#[async_trait]
impl PaymentVerifier for MockPaymentVerifier {
    async fn lookup(&self, lookup: PaymentLookup<'_>) -> Result<ProviderTransaction, UpstreamError> {
        Ok(ProviderTransaction {
            reference: lookup.intent_id.to_string(),
            transaction_status: "mined".to_string(),
            transaction_hash: Some(format!("0xmock{}", lookup.transaction_id)),
        })
    }
}

/// Accepts any payload that names an address.
#[derive(Debug, Clone, Default)]
pub struct MockSignatureVerifier;

#[async_trait]
impl SignatureVerifier for MockSignatureVerifier {
    async fn verify(&self, payload: &Value, _nonce: &str) -> Result<SiweVerification, UpstreamError> {
        let address = payload["address"].as_str().map(str::to_string);
        Ok(SiweVerification {
            is_valid: address.is_some(),
            address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_balances_carry_raw_units() {
        let eth = MockBalanceSource.balance("0xabc", Token::Eth).await.unwrap();
        assert_eq!(eth.raw_balance, "150000000000000000");

        let usdc = MockBalanceSource.balance("0xabc", Token::UsdcE).await.unwrap();
        assert_eq!(usdc.raw_balance, "25000000");
    }

    #[tokio::test]
    async fn canned_prices_cover_all_tokens() {
        let table = MockPriceSource.fetch_prices().await.unwrap();
        assert_eq!(table.price(Token::Wld), Some(&BigDecimal::from_str("75.25").unwrap()));
        assert_eq!(table.prices.len(), 3);
    }
}
