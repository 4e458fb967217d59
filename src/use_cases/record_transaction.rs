//! Record transaction use case.
//! Creates a pending conversion record from a complete client submission.

use bigdecimal::BigDecimal;
use std::sync::Arc;

use crate::domain::{compute_conversion, ConversionPolicy, Token, Transaction};
use crate::error::AppError;
use crate::ports::TransactionRepository;
use crate::services::PriceFeed;
use crate::validation::{
    collect_withdrawal, sanitize_string, validate_max_len, validate_wallet_address, FieldErrors,
    ValidationError, WithdrawalInput,
};

pub const REFERENCE_MAX_LEN: usize = 64;

#[derive(Debug)]
pub struct RecordTransactionInput {
    pub address: String,
    pub token: Token,
    pub amount: BigDecimal,
    pub transaction_reference: String,
    pub withdrawal: WithdrawalInput,
}

pub struct RecordTransaction {
    transactions: Arc<dyn TransactionRepository>,
    price_feed: PriceFeed,
    policy: ConversionPolicy,
}

impl RecordTransaction {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        price_feed: PriceFeed,
        policy: ConversionPolicy,
    ) -> Self {
        Self {
            transactions,
            price_feed,
            policy,
        }
    }

    pub async fn execute(&self, input: RecordTransactionInput) -> Result<Transaction, AppError> {
        let mut errors = FieldErrors::new();
        let address = errors.check(validate_wallet_address(&input.address));
        let reference = errors.check(validate_reference(&input.transaction_reference));
        let withdrawal = match collect_withdrawal(&input.withdrawal) {
            Ok(withdrawal) => Some(withdrawal),
            Err(more) => {
                errors.extend(more);
                None
            }
        };

        let (Some(address), Some(reference), Some(withdrawal)) = (address, reference, withdrawal)
        else {
            return Err(AppError::Validation(errors));
        };

        let prices = self.price_feed.current().await;
        let quote = compute_conversion(&input.amount, input.token, &prices, None, &self.policy)?;

        let record = Transaction::new(address, quote, reference, withdrawal);
        let stored = self.transactions.insert(&record).await?;

        tracing::info!(
            transaction_id = %stored.id,
            reference = %stored.transaction_reference,
            "Transaction recorded"
        );
        Ok(stored)
    }
}

fn validate_reference(reference: &str) -> Result<String, ValidationError> {
    let reference = sanitize_string(reference);
    if reference.is_empty() {
        return Err(ValidationError::new(
            "transactionReference",
            "Transaction reference is required",
        ));
    }
    validate_max_len("transactionReference", &reference, REFERENCE_MAX_LEN)?;
    Ok(reference)
}
