use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

use crate::domain::PriceTable;
use crate::upstream::PriceSource;

/// Cached token -> INR price table, refreshed in the background.
///
/// Starts from the fallback table. A failed refresh keeps whatever table is
/// current, so the fallback is only served until the first success.
#[derive(Clone)]
pub struct PriceFeed {
    source: Arc<dyn PriceSource>,
    table: Arc<RwLock<PriceTable>>,
}

impl PriceFeed {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            table: Arc::new(RwLock::new(PriceTable::fallback())),
        }
    }

    pub fn start(&self, refresh_interval: Duration) {
        let feed = self.clone();
        tokio::spawn(async move {
            loop {
                feed.refresh().await;
                tokio::time::sleep(refresh_interval).await;
            }
        });
    }

    /// Returns true when the upstream answered.
    pub async fn refresh(&self) -> bool {
        match self.source.fetch_prices().await {
            Ok(table) => {
                tracing::info!(tokens = table.prices.len(), "Price table refreshed");
                *self.table.write().await = table;
                true
            }
            Err(e) => {
                let fallback = self.table.read().await.fallback;
                tracing::warn!(error = %e, serving_fallback = fallback, "Price refresh failed");
                false
            }
        }
    }

    pub async fn current(&self) -> PriceTable {
        self.table.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Token;
    use crate::upstream::UpstreamError;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FlakySource {
        healthy: AtomicBool,
    }

    #[async_trait]
    impl PriceSource for FlakySource {
        async fn fetch_prices(&self) -> Result<PriceTable, UpstreamError> {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(UpstreamError::CircuitBreakerOpen("test".to_string()));
            }
            let mut prices = BTreeMap::new();
            prices.insert(Token::Wld, BigDecimal::from(75));
            Ok(PriceTable::new(prices))
        }
    }

    #[tokio::test]
    async fn serves_fallback_until_first_success() {
        let source = Arc::new(FlakySource {
            healthy: AtomicBool::new(false),
        });
        let feed = PriceFeed::new(source.clone());

        assert!(!feed.refresh().await);
        assert!(feed.current().await.fallback);

        source.healthy.store(true, Ordering::SeqCst);
        assert!(feed.refresh().await);
        let table = feed.current().await;
        assert!(!table.fallback);
        assert_eq!(table.price(Token::Wld), Some(&BigDecimal::from(75)));
    }

    #[tokio::test]
    async fn keeps_last_good_table_on_failure() {
        let source = Arc::new(FlakySource {
            healthy: AtomicBool::new(true),
        });
        let feed = PriceFeed::new(source.clone());
        feed.refresh().await;

        source.healthy.store(false, Ordering::SeqCst);
        assert!(!feed.refresh().await);

        let table = feed.current().await;
        assert!(!table.fallback);
        assert_eq!(table.price(Token::Wld), Some(&BigDecimal::from(75)));
    }
}
