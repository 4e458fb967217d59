//! In-memory implementation of the storage ports, for local runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{AttemptState, Transaction, TransactionStatus, WithdrawalRequest};
use crate::ports::{
    RepositoryError, RepositoryResult, TransactionRepository, WaitlistRepository,
    WithdrawalRepository,
};

#[derive(Default)]
pub struct InMemoryStore {
    transactions: RwLock<HashMap<Uuid, Transaction>>,
    withdrawals: RwLock<HashMap<Uuid, WithdrawalRequest>>,
    waitlist: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_by_reference<'a>(
    map: &'a mut HashMap<Uuid, Transaction>,
    reference: &str,
) -> Option<&'a mut Transaction> {
    map.values_mut()
        .find(|tx| tx.transaction_reference == reference)
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut map = self.transactions.write().await;
        if map
            .values()
            .any(|existing| existing.transaction_reference == tx.transaction_reference)
        {
            return Err(RepositoryError::Conflict(format!(
                "transaction reference {} already exists",
                tx.transaction_reference
            )));
        }
        map.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn get_by_reference(&self, reference: &str) -> RepositoryResult<Transaction> {
        self.transactions
            .read()
            .await
            .values()
            .find(|tx| tx.transaction_reference == reference)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(reference.to_string()))
    }

    async fn list_by_wallet(&self, wallet_address: &str) -> RepositoryResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|tx| tx.wallet_address == wallet_address)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn mark_signed(
        &self,
        reference: &str,
        external_transaction_id: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let mut map = self.transactions.write().await;
        let tx = find_by_reference(&mut map, reference)
            .ok_or_else(|| RepositoryError::NotFound(reference.to_string()))?;

        if AttemptState::of_record(tx) != AttemptState::AwaitingSignature {
            return Ok(None);
        }
        tx.external_transaction_id = Some(external_transaction_id.to_string());
        tx.updated_at = Utc::now();
        Ok(Some(tx.clone()))
    }

    async fn complete(
        &self,
        reference: &str,
        external_transaction_id: &str,
        transaction_hash: Option<&str>,
    ) -> RepositoryResult<Option<Transaction>> {
        let mut map = self.transactions.write().await;
        let tx = find_by_reference(&mut map, reference)
            .ok_or_else(|| RepositoryError::NotFound(reference.to_string()))?;

        if tx.status != TransactionStatus::Pending {
            return Ok(None);
        }
        tx.status = TransactionStatus::Completed;
        tx.external_transaction_id = Some(external_transaction_id.to_string());
        tx.transaction_hash = transaction_hash.map(str::to_string);
        tx.updated_at = Utc::now();
        Ok(Some(tx.clone()))
    }

    async fn fail(
        &self,
        reference: &str,
        external_transaction_id: Option<&str>,
        reason: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let mut map = self.transactions.write().await;
        let tx = find_by_reference(&mut map, reference)
            .ok_or_else(|| RepositoryError::NotFound(reference.to_string()))?;

        if tx.status != TransactionStatus::Pending {
            return Ok(None);
        }
        tx.status = TransactionStatus::Failed;
        if let Some(external) = external_transaction_id {
            tx.external_transaction_id = Some(external.to_string());
        }
        tx.failure_reason = Some(reason.to_string());
        tx.updated_at = Utc::now();
        Ok(Some(tx.clone()))
    }

    async fn expire_pending(&self, cutoff: DateTime<Utc>, reason: &str) -> RepositoryResult<u64> {
        let mut map = self.transactions.write().await;
        let now = Utc::now();
        let mut expired = 0;
        for tx in map.values_mut().filter(|tx| {
            AttemptState::of_record(tx) == AttemptState::AwaitingSignature
                && tx.created_at < cutoff
        }) {
            tx.status = AttemptState::TimedOut.persisted_status();
            tx.failure_reason = Some(reason.to_string());
            tx.updated_at = now;
            expired += 1;
        }
        Ok(expired)
    }
}

#[async_trait]
impl WithdrawalRepository for InMemoryStore {
    async fn insert(&self, request: &WithdrawalRequest) -> RepositoryResult<WithdrawalRequest> {
        self.withdrawals
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<WithdrawalRequest> {
        self.withdrawals
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl WaitlistRepository for InMemoryStore {
    async fn add(&self, email: &str) -> RepositoryResult<bool> {
        let mut waitlist = self.waitlist.write().await;
        if waitlist.contains_key(email) {
            return Ok(false);
        }
        waitlist.insert(email.to_string(), Utc::now());
        Ok(true)
    }
}
