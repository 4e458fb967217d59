//! Verify payment use case.
//!
//! Settles a pending record once the provider confirms the payment. The
//! stored quote is final: prices are not fetched again here.

use std::sync::Arc;

use crate::domain::{AttemptState, FailureReason, Transaction, TransactionStatus};
use crate::error::AppError;
use crate::ports::TransactionRepository;
use crate::upstream::{PaymentLookup, PaymentVerifier, UpstreamError};
use crate::validation::validate_transaction_id;

/// Wallet SDK result as reported by the client.
#[derive(Debug)]
pub struct VerifyPaymentInput {
    pub intent_id: String,
    pub transaction_id: Option<String>,
    pub status: String,
}

#[derive(Debug)]
pub struct VerificationOutcome {
    pub transaction: Transaction,
    /// The record was already completed before this call.
    pub already_settled: bool,
}

pub struct VerifyPayment {
    transactions: Arc<dyn TransactionRepository>,
    verifier: Arc<dyn PaymentVerifier>,
}

impl VerifyPayment {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        verifier: Arc<dyn PaymentVerifier>,
    ) -> Self {
        Self {
            transactions,
            verifier,
        }
    }

    pub async fn execute(&self, input: VerifyPaymentInput) -> Result<VerificationOutcome, AppError> {
        let intent_id = input.intent_id.trim();
        if intent_id.is_empty() {
            return Err(AppError::BadRequest("Missing payment ID".to_string()));
        }

        let record = self.transactions.get_by_reference(intent_id).await?;
        let state = match AttemptState::of_record(&record) {
            AttemptState::Completed => {
                return Ok(VerificationOutcome {
                    transaction: record,
                    already_settled: true,
                })
            }
            AttemptState::Failed => {
                return Err(AppError::VerificationMismatch(format!(
                    "attempt {} already failed ({})",
                    intent_id,
                    record.failure_reason.as_deref().unwrap_or("unknown")
                )))
            }
            pending => pending,
        };

        if input.status != "success" {
            let transaction_id = input
                .transaction_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty());
            let rejected = state.transition(AttemptState::Rejected)?;
            self.settle(intent_id, rejected, transaction_id, None).await?;
            tracing::info!(intent_id = %intent_id, sdk_status = %input.status, "Payment rejected in wallet");
            return Err(AppError::PaymentRejected(format!(
                "wallet reported status {}",
                input.status
            )));
        }

        let transaction_id = match input.transaction_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => validate_transaction_id(id)?,
            _ => return Err(AppError::BadRequest("Missing transaction ID".to_string())),
        };
        let transaction_id = transaction_id.as_str();

        let state = match state {
            AttemptState::Signed => {
                ensure_same_signature(&record, transaction_id)?;
                state
            }
            awaiting => {
                let signed = awaiting.transition(AttemptState::Signed)?;
                self.record_signature(intent_id, transaction_id).await?;
                signed
            }
        };
        let state = state.transition(AttemptState::Verifying)?;

        let lookup = PaymentLookup {
            intent_id,
            transaction_id,
        };
        let provider = match self.verifier.lookup(lookup).await {
            Ok(provider) => Some(provider),
            Err(UpstreamError::NotFound(_)) => None,
            Err(e) => {
                // Stays pending and signed; the sweeper leaves it alone.
                tracing::warn!(intent_id = %intent_id, error = %e, "Verification provider unavailable");
                return Err(e.into());
            }
        };

        let confirmed = provider.as_ref().filter(|p| p.confirms(intent_id));
        let Some(confirmed) = confirmed else {
            let failed = state.transition(AttemptState::Failed)?;
            self.settle(intent_id, failed, Some(transaction_id), None).await?;
            let detail = match &provider {
                Some(p) => format!(
                    "provider reported reference {} with status {}",
                    p.reference, p.transaction_status
                ),
                None => format!("provider has no transaction {}", transaction_id),
            };
            tracing::warn!(intent_id = %intent_id, "{}", detail);
            return Err(AppError::VerificationMismatch(detail));
        };

        let completed_state = state.transition(AttemptState::Completed)?;
        let completed = self
            .settle(
                intent_id,
                completed_state,
                Some(transaction_id),
                confirmed.transaction_hash.as_deref(),
            )
            .await?;

        match completed {
            Some(transaction) => {
                tracing::info!(
                    intent_id = %intent_id,
                    final_amount = %transaction.final_amount,
                    "Payment verified"
                );
                Ok(VerificationOutcome {
                    transaction,
                    already_settled: false,
                })
            }
            // Lost a race with a concurrent verification of the same intent.
            None => self.settled_elsewhere(intent_id).await,
        }
    }

    /// Stores the signed transaction id so the record outlives the
    /// signature window while the provider is consulted.
    async fn record_signature(&self, intent_id: &str, transaction_id: &str) -> Result<(), AppError> {
        if self
            .transactions
            .mark_signed(intent_id, transaction_id)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let current = self.transactions.get_by_reference(intent_id).await?;
        match AttemptState::of_record(&current) {
            AttemptState::Signed => ensure_same_signature(&current, transaction_id),
            state => Err(AppError::VerificationMismatch(format!(
                "attempt {} was settled as {}",
                intent_id, state
            ))),
        }
    }

    /// Writes a terminal state. `None` means the record had already left
    /// `pending`.
    async fn settle(
        &self,
        intent_id: &str,
        state: AttemptState,
        transaction_id: Option<&str>,
        transaction_hash: Option<&str>,
    ) -> Result<Option<Transaction>, AppError> {
        if !state.is_terminal() {
            return Err(AppError::Internal(format!(
                "cannot settle attempt {} in state {}",
                intent_id, state
            )));
        }

        match (state.persisted_status(), transaction_id) {
            (TransactionStatus::Completed, Some(transaction_id)) => Ok(self
                .transactions
                .complete(intent_id, transaction_id, transaction_hash)
                .await?),
            (TransactionStatus::Failed, _) => {
                let reason = state
                    .failure_reason()
                    .unwrap_or(FailureReason::VerificationMismatch);
                Ok(self
                    .transactions
                    .fail(intent_id, transaction_id, reason.as_str())
                    .await?)
            }
            _ => Err(AppError::Internal(format!(
                "attempt {} reached {} without a transaction id",
                intent_id, state
            ))),
        }
    }

    async fn settled_elsewhere(&self, intent_id: &str) -> Result<VerificationOutcome, AppError> {
        let current = self.transactions.get_by_reference(intent_id).await?;
        match AttemptState::of_record(&current) {
            AttemptState::Completed => Ok(VerificationOutcome {
                transaction: current,
                already_settled: true,
            }),
            _ => Err(AppError::VerificationMismatch(format!(
                "attempt {} was settled as {}",
                intent_id, current.status
            ))),
        }
    }
}

fn ensure_same_signature(record: &Transaction, transaction_id: &str) -> Result<(), AppError> {
    if record.external_transaction_id.as_deref() == Some(transaction_id) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Transaction ID does not match the signed payment".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::domain::{
        IdentityVerification, Quote, Token, TransactionStatus, ValidatedWithdrawal,
        VerificationType, WithdrawalDetails,
    };
    use crate::upstream::ProviderTransaction;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use crate::services::sweep_once;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    enum Reply {
        Confirm,
        Status(&'static str),
        Unreachable,
    }

    struct ScriptedVerifier {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl ScriptedVerifier {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PaymentVerifier for ScriptedVerifier {
        async fn lookup(&self, lookup: PaymentLookup<'_>) -> Result<ProviderTransaction, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = match self.reply {
                Reply::Confirm => "mined",
                Reply::Status(status) => status,
                Reply::Unreachable => {
                    return Err(UpstreamError::CircuitBreakerOpen("verifier".to_string()))
                }
            };
            Ok(ProviderTransaction {
                reference: lookup.intent_id.to_string(),
                transaction_status: status.to_string(),
                transaction_hash: Some("0xfeed".to_string()),
            })
        }
    }

    /// Down until `recover` is called, then confirms.
    struct FlakyVerifier {
        up: AtomicBool,
    }

    #[async_trait]
    impl PaymentVerifier for FlakyVerifier {
        async fn lookup(&self, lookup: PaymentLookup<'_>) -> Result<ProviderTransaction, UpstreamError> {
            if !self.up.load(Ordering::SeqCst) {
                return Err(UpstreamError::CircuitBreakerOpen("verifier".to_string()));
            }
            Ok(ProviderTransaction {
                reference: lookup.intent_id.to_string(),
                transaction_status: "mined".to_string(),
                transaction_hash: Some("0xfeed".to_string()),
            })
        }
    }

    async fn store_with_pending(reference: &str) -> Arc<InMemoryStore> {
        store_with_pending_since(reference, chrono::Duration::zero()).await
    }

    async fn store_with_pending_since(reference: &str, age: chrono::Duration) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let quote = Quote {
            token: Token::Wld,
            amount: BigDecimal::from(10),
            price: BigDecimal::from_str("75.25").unwrap(),
            inr_amount: BigDecimal::from_str("752.50").unwrap(),
            fee: BigDecimal::from_str("37.63").unwrap(),
            final_amount: BigDecimal::from_str("714.87").unwrap(),
        };
        let withdrawal = ValidatedWithdrawal {
            details: WithdrawalDetails::Upi {
                upi_id: "abc@xyz".to_string(),
            },
            verification: IdentityVerification {
                verification_type: VerificationType::Pan,
                verification_number: "ABCDE1234F".to_string(),
            },
        };
        let mut tx = Transaction::new("0xabc".to_string(), quote, reference.to_string(), withdrawal);
        tx.created_at = tx.created_at - age;
        TransactionRepository::insert(store.as_ref(), &tx).await.unwrap();
        store
    }

    fn input(intent: &str, status: &str) -> VerifyPaymentInput {
        VerifyPaymentInput {
            intent_id: intent.to_string(),
            transaction_id: Some("tx-1".to_string()),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn second_verification_does_not_call_provider() {
        let store = store_with_pending("p1").await;
        let verifier = ScriptedVerifier::new(Reply::Confirm);
        let use_case = VerifyPayment::new(store.clone(), verifier.clone());

        let first = use_case.execute(input("p1", "success")).await.unwrap();
        let second = use_case.execute(input("p1", "success")).await.unwrap();

        assert!(!first.already_settled);
        assert!(second.already_settled);
        assert_eq!(second.transaction.status, TransactionStatus::Completed);
        assert_eq!(second.transaction.final_amount, BigDecimal::from_str("714.87").unwrap());
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_marks_record_failed() {
        let store = store_with_pending("p1").await;
        let use_case = VerifyPayment::new(store.clone(), ScriptedVerifier::new(Reply::Status("failed")));

        let err = use_case.execute(input("p1", "success")).await.unwrap_err();
        assert!(matches!(err, AppError::VerificationMismatch(_)));

        let record = store.get_by_reference("p1").await.unwrap();
        assert_eq!(record.status, TransactionStatus::Failed);
        assert_eq!(record.failure_reason.as_deref(), Some("verification_mismatch"));
    }

    #[tokio::test]
    async fn unreachable_provider_leaves_record_pending() {
        let store = store_with_pending("p1").await;
        let use_case = VerifyPayment::new(store.clone(), ScriptedVerifier::new(Reply::Unreachable));

        let err = use_case.execute(input("p1", "success")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            store.get_by_reference("p1").await.unwrap().status,
            TransactionStatus::Pending
        );
    }

    #[tokio::test]
    async fn provider_outage_survives_sweep_and_retry_completes() {
        let store = store_with_pending_since("p1", chrono::Duration::seconds(200)).await;
        let verifier = Arc::new(FlakyVerifier {
            up: AtomicBool::new(false),
        });
        let use_case = VerifyPayment::new(store.clone(), verifier.clone());

        let err = use_case.execute(input("p1", "success")).await.unwrap_err();
        assert!(err.is_retryable());
        let record = store.get_by_reference("p1").await.unwrap();
        assert_eq!(record.status, TransactionStatus::Pending);
        assert_eq!(record.external_transaction_id.as_deref(), Some("tx-1"));

        let swept = sweep_once(store.as_ref(), Duration::from_secs(100)).await.unwrap();
        assert_eq!(swept, 0);

        verifier.up.store(true, Ordering::SeqCst);
        let outcome = use_case.execute(input("p1", "success")).await.unwrap();
        assert!(!outcome.already_settled);
        assert_eq!(outcome.transaction.status, TransactionStatus::Completed);
        assert_eq!(outcome.transaction.transaction_hash.as_deref(), Some("0xfeed"));
    }

    #[tokio::test]
    async fn unsigned_stale_record_is_still_swept() {
        let store = store_with_pending_since("p1", chrono::Duration::seconds(200)).await;

        let swept = sweep_once(store.as_ref(), Duration::from_secs(100)).await.unwrap();
        assert_eq!(swept, 1);

        let use_case = VerifyPayment::new(store.clone(), ScriptedVerifier::new(Reply::Confirm));
        let err = use_case.execute(input("p1", "success")).await.unwrap_err();
        assert!(matches!(err, AppError::VerificationMismatch(ref m) if m.contains("signature_timeout")));
    }

    #[tokio::test]
    async fn retry_must_carry_the_signed_transaction_id() {
        let store = store_with_pending("p1").await;
        let verifier = Arc::new(FlakyVerifier {
            up: AtomicBool::new(false),
        });
        let use_case = VerifyPayment::new(store.clone(), verifier.clone());
        assert!(use_case.execute(input("p1", "success")).await.is_err());

        verifier.up.store(true, Ordering::SeqCst);
        let mut other = input("p1", "success");
        other.transaction_id = Some("tx-2".to_string());
        assert!(matches!(
            use_case.execute(other).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            store.get_by_reference("p1").await.unwrap().status,
            TransactionStatus::Pending
        );
    }

    #[tokio::test]
    async fn malformed_transaction_id_is_rejected_before_lookup() {
        let store = store_with_pending("p1").await;
        let verifier = ScriptedVerifier::new(Reply::Confirm);
        let use_case = VerifyPayment::new(store.clone(), verifier.clone());

        let mut bad = input("p1", "success");
        bad.transaction_id = Some("../../other".to_string());
        assert!(matches!(
            use_case.execute(bad).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
        assert!(store
            .get_by_reference("p1")
            .await
            .unwrap()
            .external_transaction_id
            .is_none());
    }

    #[tokio::test]
    async fn wallet_rejection_fails_without_provider_call() {
        let store = store_with_pending("p1").await;
        let verifier = ScriptedVerifier::new(Reply::Confirm);
        let use_case = VerifyPayment::new(store.clone(), verifier.clone());

        let err = use_case.execute(input("p1", "error")).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentRejected(_)));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.get_by_reference("p1").await.unwrap().failure_reason.as_deref(),
            Some("payment_rejected")
        );
    }

    #[tokio::test]
    async fn unknown_intent_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let use_case = VerifyPayment::new(store, ScriptedVerifier::new(Reply::Confirm));
        assert!(matches!(
            use_case.execute(input("nope", "success")).await,
            Err(AppError::NotFound(_))
        ));
    }
}
