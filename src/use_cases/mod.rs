//! Application use cases. Each one wires ports and services for a single
//! operation and returns `AppError` so handlers stay thin.

pub mod initiate_payment;
pub mod record_transaction;
pub mod submit_withdrawal;
pub mod verify_payment;

pub use initiate_payment::{InitiatePayment, InitiatePaymentInput, PaymentIntent};
pub use record_transaction::{RecordTransaction, RecordTransactionInput};
pub use submit_withdrawal::SubmitWithdrawal;
pub use verify_payment::{VerificationOutcome, VerifyPayment, VerifyPaymentInput};
