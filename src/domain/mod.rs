//! Domain layer: framework-agnostic entities and pure business rules.

pub mod attempt;
pub mod pricing;
pub mod token;
pub mod transaction;
pub mod withdrawal;

pub use attempt::{AttemptState, InvalidTransition};
pub use pricing::{compute_conversion, ConversionError, ConversionPolicy, PriceTable, Quote};
pub use token::Token;
pub use transaction::{FailureReason, Transaction, TransactionStatus, TransactionView};
pub use withdrawal::{
    IdentityVerification, ValidatedWithdrawal, VerificationType, WithdrawalDetails,
    WithdrawalMethod, WithdrawalRequest,
};
