use chrono::Utc;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::domain::FailureReason;
use crate::ports::{RepositoryResult, TransactionRepository};

/// Fails pending attempts whose wallet signature never arrived.
pub async fn run_expiry_sweeper(
    transactions: Arc<dyn TransactionRepository>,
    signature_timeout: Duration,
    sweep_interval: Duration,
) {
    info!(
        timeout_secs = signature_timeout.as_secs(),
        "Signature expiry sweeper started"
    );

    loop {
        if let Err(e) = sweep_once(transactions.as_ref(), signature_timeout).await {
            error!("Expiry sweep error: {}", e);
        }

        sleep(sweep_interval).await;
    }
}

pub async fn sweep_once(
    transactions: &dyn TransactionRepository,
    signature_timeout: Duration,
) -> RepositoryResult<u64> {
    let timeout = chrono::Duration::from_std(signature_timeout)
        .unwrap_or_else(|_| chrono::Duration::seconds(300));
    let cutoff = Utc::now() - timeout;

    let expired = transactions
        .expire_pending(cutoff, FailureReason::SignatureTimeout.as_str())
        .await?;

    if expired > 0 {
        info!(expired, "Expired unsigned payment attempts");
    } else {
        debug!("No stale payment attempts");
    }
    Ok(expired)
}
