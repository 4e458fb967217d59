//! Submit withdrawal use case.

use std::sync::Arc;

use crate::domain::WithdrawalRequest;
use crate::error::AppError;
use crate::ports::WithdrawalRepository;
use crate::validation::{collect_withdrawal, validate_wallet_address, FieldErrors, WithdrawalInput};

pub struct SubmitWithdrawal {
    withdrawals: Arc<dyn WithdrawalRepository>,
}

impl SubmitWithdrawal {
    pub fn new(withdrawals: Arc<dyn WithdrawalRepository>) -> Self {
        Self { withdrawals }
    }

    pub async fn execute(
        &self,
        address: &str,
        input: &WithdrawalInput,
    ) -> Result<WithdrawalRequest, AppError> {
        let mut errors = FieldErrors::new();
        let address = errors.check(validate_wallet_address(address));
        let withdrawal = match collect_withdrawal(input) {
            Ok(withdrawal) => Some(withdrawal),
            Err(more) => {
                errors.extend(more);
                None
            }
        };

        let (Some(address), Some(withdrawal)) = (address, withdrawal) else {
            return Err(AppError::Validation(errors));
        };

        let request = self
            .withdrawals
            .insert(&WithdrawalRequest::new(address, withdrawal))
            .await?;

        tracing::info!(
            withdrawal_id = %request.id,
            method = %request.details.method(),
            "Withdrawal request recorded"
        );
        Ok(request)
    }
}
