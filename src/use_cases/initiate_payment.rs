//! Initiate payment use case.
//! Re-checks balance and price, then opens one pending record per intent.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    compute_conversion, AttemptState, ConversionPolicy, Quote, Token, Transaction,
    ValidatedWithdrawal,
};
use crate::error::AppError;
use crate::ports::{TransactionRepository, WithdrawalRepository};
use crate::services::PriceFeed;
use crate::upstream::BalanceSource;
use crate::validation::validate_wallet_address;

#[derive(Debug)]
pub struct InitiatePaymentInput {
    pub address: String,
    pub token: Token,
    pub amount: BigDecimal,
    pub withdrawal_id: Uuid,
}

/// What the client hands to the wallet SDK.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub token: Token,
    pub amount: BigDecimal,
    /// `amount` in the token's smallest unit.
    pub raw_amount: String,
    pub recipient: String,
    pub quote: Quote,
    pub transaction_id: Uuid,
}

pub struct InitiatePayment {
    transactions: Arc<dyn TransactionRepository>,
    withdrawals: Arc<dyn WithdrawalRepository>,
    balances: Arc<dyn BalanceSource>,
    price_feed: PriceFeed,
    policy: ConversionPolicy,
    escrow_address: String,
}

impl InitiatePayment {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        withdrawals: Arc<dyn WithdrawalRepository>,
        balances: Arc<dyn BalanceSource>,
        price_feed: PriceFeed,
        policy: ConversionPolicy,
        escrow_address: String,
    ) -> Self {
        Self {
            transactions,
            withdrawals,
            balances,
            price_feed,
            policy,
            escrow_address,
        }
    }

    pub async fn execute(&self, input: InitiatePaymentInput) -> Result<PaymentIntent, AppError> {
        let state = AttemptState::Quoted;
        let address = validate_wallet_address(&input.address)?;

        let balance = self.balances.balance(&address, input.token).await?;
        let prices = self.price_feed.current().await;
        let quote = compute_conversion(
            &input.amount,
            input.token,
            &prices,
            Some(&balance.balance),
            &self.policy,
        )?;

        let withdrawal = self.withdrawals.get_by_id(input.withdrawal_id).await?;
        if withdrawal.wallet_address != address {
            return Err(AppError::NotFound(format!(
                "withdrawal request {}",
                input.withdrawal_id
            )));
        }

        let intent_id = Uuid::new_v4().simple().to_string();
        let record = Transaction::new(
            address.clone(),
            quote.clone(),
            intent_id.clone(),
            ValidatedWithdrawal {
                details: withdrawal.details,
                verification: withdrawal.verification,
            },
        );
        let stored = self.transactions.insert(&record).await?;
        let state = state
            .transition(AttemptState::PaymentInitiated)?
            .transition(AttemptState::AwaitingSignature)?;

        tracing::info!(
            intent_id = %intent_id,
            wallet = %address,
            token = %input.token,
            final_amount = %quote.final_amount,
            fallback_prices = prices.fallback,
            state = %state,
            "Payment intent issued"
        );

        Ok(PaymentIntent {
            id: intent_id,
            token: input.token,
            raw_amount: token_units(&quote.amount, input.token),
            amount: quote.amount.clone(),
            recipient: self.escrow_address.clone(),
            quote,
            transaction_id: stored.id,
        })
    }
}

/// Integer amount in the token's smallest unit. Sub-unit dust is dropped.
pub fn token_units(amount: &BigDecimal, token: Token) -> String {
    let scale = BigDecimal::from(10u64.pow(token.decimals()));
    (amount * scale).with_scale(0).to_string()
}
