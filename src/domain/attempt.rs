//! Lifecycle of one conversion attempt.
//!
//! ```text
//! Quoted -> PaymentInitiated -> AwaitingSignature -> Signed   -> Verifying -> Completed
//!                                                  -> Rejected              -> Failed
//!                                                  -> TimedOut
//! ```
//!
//! Only `PaymentInitiated` and later states have a stored record. A terminal
//! state is written as [`AttemptState::persisted_status`] together with its
//! [`AttemptState::failure_reason`]. A pending record that carries the wallet's
//! transaction id is `Signed`; the expiry sweeper only times out records that
//! are still `AwaitingSignature`.

use std::fmt;

use super::transaction::{FailureReason, Transaction, TransactionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Quoted,
    PaymentInitiated,
    AwaitingSignature,
    Signed,
    Rejected,
    TimedOut,
    Verifying,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid attempt transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: AttemptState,
    pub to: AttemptState,
}

impl AttemptState {
    pub fn can_transition_to(&self, next: AttemptState) -> bool {
        use AttemptState::*;
        matches!(
            (self, next),
            (Quoted, PaymentInitiated)
                | (PaymentInitiated, AwaitingSignature)
                | (AwaitingSignature, Signed)
                | (AwaitingSignature, Rejected)
                | (AwaitingSignature, TimedOut)
                | (Signed, Verifying)
                | (Verifying, Completed)
                | (Verifying, Failed)
        )
    }

    pub fn transition(self, next: AttemptState) -> Result<AttemptState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Rejected
                | AttemptState::TimedOut
                | AttemptState::Completed
                | AttemptState::Failed
        )
    }

    pub fn persisted_status(&self) -> TransactionStatus {
        match self {
            AttemptState::Completed => TransactionStatus::Completed,
            AttemptState::Rejected | AttemptState::TimedOut | AttemptState::Failed => {
                TransactionStatus::Failed
            }
            _ => TransactionStatus::Pending,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            AttemptState::Rejected => Some(FailureReason::PaymentRejected),
            AttemptState::TimedOut => Some(FailureReason::SignatureTimeout),
            AttemptState::Failed => Some(FailureReason::VerificationMismatch),
            _ => None,
        }
    }

    /// Resume point for a stored record.
    pub fn of_record(tx: &Transaction) -> AttemptState {
        match tx.status {
            TransactionStatus::Pending if tx.external_transaction_id.is_some() => {
                AttemptState::Signed
            }
            TransactionStatus::Pending => AttemptState::AwaitingSignature,
            TransactionStatus::Completed => AttemptState::Completed,
            TransactionStatus::Failed => AttemptState::Failed,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptState::Quoted => "quoted",
            AttemptState::PaymentInitiated => "payment_initiated",
            AttemptState::AwaitingSignature => "awaiting_signature",
            AttemptState::Signed => "signed",
            AttemptState::Rejected => "rejected",
            AttemptState::TimedOut => "timed_out",
            AttemptState::Verifying => "verifying",
            AttemptState::Completed => "completed",
            AttemptState::Failed => "failed",
        };
        f.write_str(name)
    }
}
