//! Supported source tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const WLD_CONTRACT: &str = "0xD1B5651E55D4CeeD36251c61c50C889B36F6abB5";
pub const USDC_E_CONTRACT: &str = "0x744ba001bfebd5fbfa5eb38394d0988d9d8b2448";

/// Token a wallet holder can convert into INR. The set is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Token {
    #[serde(rename = "WLD")]
    Wld,
    #[serde(rename = "USDC.e")]
    UsdcE,
    #[serde(rename = "ETH")]
    Eth,
}

impl Token {
    pub const ALL: [Token; 3] = [Token::Wld, Token::UsdcE, Token::Eth];

    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Wld => "WLD",
            Token::UsdcE => "USDC.e",
            Token::Eth => "ETH",
        }
    }

    pub fn decimals(&self) -> u32 {
        match self {
            Token::Wld | Token::Eth => 18,
            Token::UsdcE => 6,
        }
    }

    /// ERC-20 contract on World Chain. ETH is native and has none.
    pub fn contract_address(&self) -> Option<&'static str> {
        match self {
            Token::Wld => Some(WLD_CONTRACT),
            Token::UsdcE => Some(USDC_E_CONTRACT),
            Token::Eth => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported token: {0}")]
pub struct UnsupportedToken(pub String);

impl FromStr for Token {
    type Err = UnsupportedToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "WLD" => Ok(Token::Wld),
            "USDC.e" => Ok(Token::UsdcE),
            "ETH" => Ok(Token::Eth),
            other => Err(UnsupportedToken(other.to_string())),
        }
    }
}
