//! Storage ports. Adapters live in `crate::adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Transaction, WithdrawalRequest};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Conversion records. `transaction_reference` (the payment intent id) is unique.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn get_by_reference(&self, reference: &str) -> RepositoryResult<Transaction>;

    /// Newest first, ties broken by id descending. An unknown wallet yields an
    /// empty list.
    async fn list_by_wallet(&self, wallet_address: &str) -> RepositoryResult<Vec<Transaction>>;

    /// Stores the wallet's transaction id on a pending record that has none
    /// yet. Returns `None` when the record was not pending or already signed.
    /// A signed record is no longer eligible for signature expiry.
    async fn mark_signed(
        &self,
        reference: &str,
        external_transaction_id: &str,
    ) -> RepositoryResult<Option<Transaction>>;

    /// pending -> completed. Returns `None` when the record was not pending,
    /// so a repeated verification never applies twice.
    async fn complete(
        &self,
        reference: &str,
        external_transaction_id: &str,
        transaction_hash: Option<&str>,
    ) -> RepositoryResult<Option<Transaction>>;

    /// pending -> failed. Returns `None` when the record was not pending.
    async fn fail(
        &self,
        reference: &str,
        external_transaction_id: Option<&str>,
        reason: &str,
    ) -> RepositoryResult<Option<Transaction>>;

    /// Fails every pending record created before `cutoff` that never received
    /// an external transaction id. Returns the number of records touched.
    async fn expire_pending(&self, cutoff: DateTime<Utc>, reason: &str) -> RepositoryResult<u64>;
}

#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    async fn insert(&self, request: &WithdrawalRequest) -> RepositoryResult<WithdrawalRequest>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<WithdrawalRequest>;
}

#[async_trait]
pub trait WaitlistRepository: Send + Sync {
    /// Returns `false` when the email was already registered.
    async fn add(&self, email: &str) -> RepositoryResult<bool>;
}
