use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{IdentityVerification, WithdrawalDetails, WithdrawalRequest};
use crate::ports::{RepositoryError, RepositoryResult, WithdrawalRepository};

#[derive(Clone)]
pub struct PostgresWithdrawalRepository {
    pool: PgPool,
}

impl PostgresWithdrawalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WithdrawalRepository for PostgresWithdrawalRepository {
    async fn insert(&self, request: &WithdrawalRequest) -> RepositoryResult<WithdrawalRequest> {
        let details = serde_json::to_value(&request.details)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            INSERT INTO withdrawal_requests (
                id, wallet_address, withdrawal_method, withdrawal_details,
                verification_type, verification_number, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, wallet_address, withdrawal_details, verification_type,
                      verification_number, status, created_at
            "#,
        )
        .bind(request.id)
        .bind(&request.wallet_address)
        .bind(request.details.method().as_str())
        .bind(details)
        .bind(request.verification.verification_type.as_str())
        .bind(&request.verification.verification_number)
        .bind(&request.status)
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<WithdrawalRequest> {
        let row = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            SELECT id, wallet_address, withdrawal_details, verification_type,
                   verification_number, status, created_at
            FROM withdrawal_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WithdrawalRow {
    id: Uuid,
    wallet_address: String,
    withdrawal_details: serde_json::Value,
    verification_type: String,
    verification_number: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl WithdrawalRow {
    fn into_domain(self) -> RepositoryResult<WithdrawalRequest> {
        let details: WithdrawalDetails = serde_json::from_value(self.withdrawal_details)
            .map_err(|e| RepositoryError::Database(format!("invalid withdrawal_details: {}", e)))?;
        let verification_type = self
            .verification_type
            .parse()
            .map_err(RepositoryError::Database)?;

        Ok(WithdrawalRequest {
            id: self.id,
            wallet_address: self.wallet_address,
            details,
            verification: IdentityVerification {
                verification_type,
                verification_number: self.verification_number,
            },
            status: self.status,
            created_at: self.created_at,
        })
    }
}
