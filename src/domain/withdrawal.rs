//! Payout destinations and identity verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalMethod {
    Upi,
    Phonepe,
    Gpay,
    Paytm,
    Bank,
}

impl WithdrawalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalMethod::Upi => "upi",
            WithdrawalMethod::Phonepe => "phonepe",
            WithdrawalMethod::Gpay => "gpay",
            WithdrawalMethod::Paytm => "paytm",
            WithdrawalMethod::Bank => "bank",
        }
    }

    /// Human label used in "is required" messages.
    pub fn phone_label(&self) -> &'static str {
        match self {
            WithdrawalMethod::Phonepe => "PhonePe number",
            WithdrawalMethod::Gpay => "Google Pay number",
            WithdrawalMethod::Paytm => "Paytm number",
            _ => "Phone number",
        }
    }
}

impl fmt::Display for WithdrawalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upi" => Ok(WithdrawalMethod::Upi),
            "phonepe" => Ok(WithdrawalMethod::Phonepe),
            "gpay" => Ok(WithdrawalMethod::Gpay),
            "paytm" => Ok(WithdrawalMethod::Paytm),
            "bank" => Ok(WithdrawalMethod::Bank),
            other => Err(format!("unknown withdrawal method: {}", other)),
        }
    }
}

/// Validated payout destination. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum WithdrawalDetails {
    Upi {
        #[serde(rename = "upiId")]
        upi_id: String,
    },
    Phonepe {
        #[serde(rename = "phoneNumber")]
        phone_number: String,
    },
    Gpay {
        #[serde(rename = "phoneNumber")]
        phone_number: String,
    },
    Paytm {
        #[serde(rename = "phoneNumber")]
        phone_number: String,
    },
    Bank {
        #[serde(rename = "accountNumber")]
        account_number: String,
        #[serde(rename = "ifscCode")]
        ifsc_code: String,
        #[serde(rename = "accountName")]
        account_name: String,
        #[serde(rename = "bankName")]
        bank_name: String,
    },
}

impl WithdrawalDetails {
    pub fn method(&self) -> WithdrawalMethod {
        match self {
            WithdrawalDetails::Upi { .. } => WithdrawalMethod::Upi,
            WithdrawalDetails::Phonepe { .. } => WithdrawalMethod::Phonepe,
            WithdrawalDetails::Gpay { .. } => WithdrawalMethod::Gpay,
            WithdrawalDetails::Paytm { .. } => WithdrawalMethod::Paytm,
            WithdrawalDetails::Bank { .. } => WithdrawalMethod::Bank,
        }
    }

    pub fn phone(method: WithdrawalMethod, phone_number: String) -> Option<Self> {
        match method {
            WithdrawalMethod::Phonepe => Some(WithdrawalDetails::Phonepe { phone_number }),
            WithdrawalMethod::Gpay => Some(WithdrawalDetails::Gpay { phone_number }),
            WithdrawalMethod::Paytm => Some(WithdrawalDetails::Paytm { phone_number }),
            WithdrawalMethod::Upi | WithdrawalMethod::Bank => None,
        }
    }

    /// Copy safe to return over the API: account and phone numbers keep only
    /// their last four characters.
    pub fn masked(&self) -> Self {
        match self {
            WithdrawalDetails::Upi { upi_id } => WithdrawalDetails::Upi {
                upi_id: upi_id.clone(),
            },
            WithdrawalDetails::Phonepe { phone_number } => WithdrawalDetails::Phonepe {
                phone_number: mask_tail(phone_number),
            },
            WithdrawalDetails::Gpay { phone_number } => WithdrawalDetails::Gpay {
                phone_number: mask_tail(phone_number),
            },
            WithdrawalDetails::Paytm { phone_number } => WithdrawalDetails::Paytm {
                phone_number: mask_tail(phone_number),
            },
            WithdrawalDetails::Bank {
                account_number,
                ifsc_code,
                account_name,
                bank_name,
            } => WithdrawalDetails::Bank {
                account_number: mask_tail(account_number),
                ifsc_code: ifsc_code.clone(),
                account_name: account_name.clone(),
                bank_name: bank_name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationType {
    Aadhaar,
    Pan,
}

impl VerificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationType::Aadhaar => "aadhaar",
            VerificationType::Pan => "pan",
        }
    }
}

impl FromStr for VerificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aadhaar" => Ok(VerificationType::Aadhaar),
            "pan" => Ok(VerificationType::Pan),
            other => Err(format!("unknown verification type: {}", other)),
        }
    }
}

/// Normalized identity document: 12 bare digits for Aadhaar, uppercase PAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityVerification {
    pub verification_type: VerificationType,
    pub verification_number: String,
}

impl IdentityVerification {
    pub fn masked_number(&self) -> String {
        mask_tail(&self.verification_number)
    }
}

fn mask_tail(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Output of the withdrawal collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedWithdrawal {
    pub details: WithdrawalDetails,
    pub verification: IdentityVerification,
}

/// A payout destination submitted ahead of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub wallet_address: String,
    pub details: WithdrawalDetails,
    pub verification: IdentityVerification,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    pub fn new(wallet_address: String, withdrawal: ValidatedWithdrawal) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_address,
            details: withdrawal.details,
            verification: withdrawal.verification,
            status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }
}
