//! Transaction domain entity.
//! Framework-agnostic representation of one crypto -> INR conversion.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::pricing::Quote;
use super::token::Token;
use super::withdrawal::{IdentityVerification, ValidatedWithdrawal, WithdrawalDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Why an attempt ended in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    PaymentRejected,
    SignatureTimeout,
    VerificationMismatch,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::PaymentRejected => "payment_rejected",
            FailureReason::SignatureTimeout => "signature_timeout",
            FailureReason::VerificationMismatch => "verification_mismatch",
        }
    }
}

/// Domain entity representing a conversion record.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_address: String,
    pub token: Token,
    pub amount: BigDecimal,
    pub quoted_price: BigDecimal,
    pub inr_amount: BigDecimal,
    pub fee: BigDecimal,
    pub final_amount: BigDecimal,
    pub transaction_reference: String,
    pub withdrawal: WithdrawalDetails,
    pub verification: IdentityVerification,
    pub status: TransactionStatus,
    pub external_transaction_id: Option<String>,
    pub transaction_hash: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// New pending record. The quote is frozen here and reused at settlement.
    pub fn new(
        wallet_address: String,
        quote: Quote,
        transaction_reference: String,
        withdrawal: ValidatedWithdrawal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            wallet_address,
            token: quote.token,
            amount: quote.amount,
            quoted_price: quote.price,
            inr_amount: quote.inr_amount,
            fee: quote.fee,
            final_amount: quote.final_amount,
            transaction_reference,
            withdrawal: withdrawal.details,
            verification: withdrawal.verification,
            status: TransactionStatus::Pending,
            external_transaction_id: None,
            transaction_hash: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// API representation. Identity and account numbers are masked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Uuid,
    pub wallet_address: String,
    pub token: Token,
    pub amount: BigDecimal,
    pub inr_amount: BigDecimal,
    pub fee: BigDecimal,
    pub final_amount: BigDecimal,
    pub transaction_reference: String,
    pub withdrawal_method: String,
    pub withdrawal_details: WithdrawalDetails,
    pub verification_type: String,
    pub verification_number: String,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            wallet_address: tx.wallet_address.clone(),
            token: tx.token,
            amount: tx.amount.clone(),
            inr_amount: tx.inr_amount.clone(),
            fee: tx.fee.clone(),
            final_amount: tx.final_amount.clone(),
            transaction_reference: tx.transaction_reference.clone(),
            withdrawal_method: tx.withdrawal.method().to_string(),
            withdrawal_details: tx.withdrawal.masked(),
            verification_type: tx.verification.verification_type.as_str().to_string(),
            verification_number: tx.verification.masked_number(),
            status: tx.status,
            transaction_hash: tx.transaction_hash.clone(),
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}
