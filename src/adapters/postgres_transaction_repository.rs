//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{IdentityVerification, Transaction, WithdrawalDetails};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

const TRANSACTION_COLUMNS: &str = r#"
    id, wallet_address, token, amount, quoted_price, inr_amount, fee, final_amount,
    transaction_reference, withdrawal_method, withdrawal_details, verification_type,
    verification_number, status, external_transaction_id, transaction_hash, failure_reason,
    created_at, updated_at
"#;

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let details = serde_json::to_value(&tx.withdrawal)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions (
                id, wallet_address, token, amount, quoted_price, inr_amount, fee, final_amount,
                transaction_reference, withdrawal_method, withdrawal_details, verification_type,
                verification_number, status, external_transaction_id, transaction_hash,
                failure_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(tx.id)
        .bind(&tx.wallet_address)
        .bind(tx.token.symbol())
        .bind(&tx.amount)
        .bind(&tx.quoted_price)
        .bind(&tx.inr_amount)
        .bind(&tx.fee)
        .bind(&tx.final_amount)
        .bind(&tx.transaction_reference)
        .bind(tx.withdrawal.method().as_str())
        .bind(details)
        .bind(tx.verification.verification_type.as_str())
        .bind(&tx.verification.verification_number)
        .bind(tx.status.as_str())
        .bind(&tx.external_transaction_id)
        .bind(&tx.transaction_hash)
        .bind(&tx.failure_reason)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_reference(&self, reference: &str) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE transaction_reference = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(reference.to_string()))?
            .into_domain()
    }

    async fn list_by_wallet(&self, wallet_address: &str) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE wallet_address = $1 ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(wallet_address)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn mark_signed(
        &self,
        reference: &str,
        external_transaction_id: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET external_transaction_id = $2, updated_at = NOW()
            WHERE transaction_reference = $1
              AND status = 'pending'
              AND external_transaction_id IS NULL
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .bind(external_transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        match row {
            Some(row) => row.into_domain().map(Some),
            None => self.get_by_reference(reference).await.map(|_| None),
        }
    }

    async fn complete(
        &self,
        reference: &str,
        external_transaction_id: &str,
        transaction_hash: Option<&str>,
    ) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET status = 'completed', external_transaction_id = $2, transaction_hash = $3,
                updated_at = NOW()
            WHERE transaction_reference = $1 AND status = 'pending'
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .bind(external_transaction_id)
        .bind(transaction_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        match row {
            Some(row) => row.into_domain().map(Some),
            None => self.get_by_reference(reference).await.map(|_| None),
        }
    }

    async fn fail(
        &self,
        reference: &str,
        external_transaction_id: Option<&str>,
        reason: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET status = 'failed',
                external_transaction_id = COALESCE($2, external_transaction_id),
                failure_reason = $3,
                updated_at = NOW()
            WHERE transaction_reference = $1 AND status = 'pending'
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .bind(external_transaction_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        match row {
            Some(row) => row.into_domain().map(Some),
            None => self.get_by_reference(reference).await.map(|_| None),
        }
    }

    async fn expire_pending(&self, cutoff: DateTime<Utc>, reason: &str) -> RepositoryResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = 'failed', failure_reason = $2, updated_at = NOW()
            WHERE status = 'pending'
              AND external_transaction_id IS NULL
              AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    wallet_address: String,
    token: String,
    amount: BigDecimal,
    quoted_price: BigDecimal,
    inr_amount: BigDecimal,
    fee: BigDecimal,
    final_amount: BigDecimal,
    transaction_reference: String,
    #[allow(dead_code)]
    withdrawal_method: String,
    withdrawal_details: serde_json::Value,
    verification_type: String,
    verification_number: String,
    status: String,
    external_transaction_id: Option<String>,
    transaction_hash: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupt(column: &str, id: Uuid, detail: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Database(format!("invalid {} on row {}: {}", column, id, detail))
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let id = self.id;
        let withdrawal: WithdrawalDetails = serde_json::from_value(self.withdrawal_details)
            .map_err(|e| corrupt("withdrawal_details", id, e))?;

        Ok(Transaction {
            id,
            wallet_address: self.wallet_address,
            token: self.token.parse().map_err(|e| corrupt("token", id, e))?,
            amount: self.amount,
            quoted_price: self.quoted_price,
            inr_amount: self.inr_amount,
            fee: self.fee,
            final_amount: self.final_amount,
            transaction_reference: self.transaction_reference,
            withdrawal,
            verification: IdentityVerification {
                verification_type: self
                    .verification_type
                    .parse()
                    .map_err(|e| corrupt("verification_type", id, e))?,
                verification_number: self.verification_number,
            },
            status: self.status.parse().map_err(|e| corrupt("status", id, e))?,
            external_transaction_id: self.external_transaction_id,
            transaction_hash: self.transaction_hash,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
