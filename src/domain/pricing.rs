//! Conversion pricing.
//!
//! All INR values are rounded to two decimals, half away from zero:
//! `inr_amount = round2(amount * price)`, `fee = round2(inr_amount * rate)`,
//! `final_amount = inr_amount - fee`.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::token::Token;

/// INR unit prices used when the upstream price providers cannot be reached.
pub const FALLBACK_PRICES: [(Token, &str); 3] = [
    (Token::Wld, "1250.75"),
    (Token::UsdcE, "83.38"),
    (Token::Eth, "250150.5"),
];

/// Token -> INR unit price table.
#[derive(Debug, Clone, Serialize)]
pub struct PriceTable {
    pub prices: BTreeMap<Token, BigDecimal>,
    pub fallback: bool,
    #[serde(rename = "fetchedAt")]
    pub fetched_at: DateTime<Utc>,
}

impl PriceTable {
    pub fn new(prices: BTreeMap<Token, BigDecimal>) -> Self {
        Self {
            prices,
            fallback: false,
            fetched_at: Utc::now(),
        }
    }

    pub fn fallback() -> Self {
        let prices = FALLBACK_PRICES
            .iter()
            .filter_map(|(token, price)| BigDecimal::from_str(price).ok().map(|p| (*token, p)))
            .collect();

        Self {
            prices,
            fallback: true,
            fetched_at: Utc::now(),
        }
    }

    pub fn price(&self, token: Token) -> Option<&BigDecimal> {
        self.prices.get(&token)
    }
}

/// Business knobs applied to every quote.
#[derive(Debug, Clone)]
pub struct ConversionPolicy {
    pub min_final_amount: BigDecimal,
    pub fee_percent: BigDecimal,
}

impl ConversionPolicy {
    pub fn fee_rate(&self) -> BigDecimal {
        &self.fee_percent / BigDecimal::from(100)
    }
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self {
            min_final_amount: BigDecimal::from(500),
            fee_percent: BigDecimal::from(5),
        }
    }
}

/// Output of a successful conversion quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub token: Token,
    pub amount: BigDecimal,
    pub price: BigDecimal,
    pub inr_amount: BigDecimal,
    pub fee: BigDecimal,
    pub final_amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("Please enter a valid amount")]
    InvalidAmount,

    #[error("No price available for {0}")]
    PriceUnavailable(Token),

    #[error("You don't have enough {token}")]
    InsufficientBalance { token: Token, available: BigDecimal },

    #[error("Minimum conversion amount is ₹{minimum}")]
    BelowMinimum { minimum: BigDecimal, final_amount: BigDecimal },
}

pub fn round2(value: &BigDecimal) -> BigDecimal {
    value.round(2)
}

/// Quote `amount` of `token` in INR. `available` is the wallet's balance for
/// `token` when known; `None` skips the balance check.
pub fn compute_conversion(
    amount: &BigDecimal,
    token: Token,
    prices: &PriceTable,
    available: Option<&BigDecimal>,
    policy: &ConversionPolicy,
) -> Result<Quote, ConversionError> {
    if amount <= &BigDecimal::from(0) {
        return Err(ConversionError::InvalidAmount);
    }

    if let Some(available) = available {
        if amount > available {
            return Err(ConversionError::InsufficientBalance {
                token,
                available: available.clone(),
            });
        }
    }

    let price = prices
        .price(token)
        .ok_or(ConversionError::PriceUnavailable(token))?
        .clone();

    let inr_amount = round2(&(amount * &price));
    let fee = round2(&(&inr_amount * policy.fee_rate()));
    let final_amount = &inr_amount - &fee;

    if final_amount < policy.min_final_amount {
        return Err(ConversionError::BelowMinimum {
            minimum: policy.min_final_amount.clone(),
            final_amount,
        });
    }

    Ok(Quote {
        token,
        amount: amount.clone(),
        price,
        inr_amount,
        fee,
        final_amount,
    })
}
