use async_trait::async_trait;
use sqlx::PgPool;

use crate::ports::{RepositoryError, RepositoryResult, WaitlistRepository};

#[derive(Clone)]
pub struct PostgresWaitlistRepository {
    pool: PgPool,
}

impl PostgresWaitlistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WaitlistRepository for PostgresWaitlistRepository {
    async fn add(&self, email: &str) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "INSERT INTO waitlist (email, created_at) VALUES ($1, NOW()) ON CONFLICT (email) DO NOTHING",
        )
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() == 1)
    }
}
