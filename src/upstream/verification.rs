use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use super::{guarded, http_client, Breaker, BreakerSettings};
use super::{PaymentLookup, PaymentVerifier, ProviderTransaction, UpstreamError};

const SERVICE: &str = "dev-portal-transactions";

/// Developer Portal payment lookup.
#[derive(Clone)]
pub struct DevPortalVerifier {
    client: Client,
    base_url: String,
    app_id: String,
    api_key: String,
    circuit_breaker: Breaker,
}

impl DevPortalVerifier {
    pub fn new(base_url: String, app_id: String, api_key: String) -> Self {
        Self {
            client: http_client(),
            base_url,
            app_id,
            api_key,
            circuit_breaker: BreakerSettings::default().build(),
        }
    }

    pub fn with_breaker(mut self, settings: BreakerSettings) -> Self {
        self.circuit_breaker = settings.build();
        self
    }

    /// The transaction id always lands as one encoded path segment.
    fn transaction_url(&self, transaction_id: &str) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| UpstreamError::invalid(SERVICE, format!("bad base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::invalid(SERVICE, "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["api", "v2", "minikit", "transaction"])
            .push(transaction_id);
        url.query_pairs_mut()
            .append_pair("app_id", &self.app_id)
            .append_pair("type", "payment");
        Ok(url)
    }
}

fn is_transaction_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

#[async_trait]
impl PaymentVerifier for DevPortalVerifier {
    async fn lookup(&self, lookup: PaymentLookup<'_>) -> Result<ProviderTransaction, UpstreamError> {
        if !is_transaction_id(lookup.transaction_id) {
            return Err(UpstreamError::NotFound(lookup.transaction_id.to_string()));
        }
        let url = self.transaction_url(lookup.transaction_id)?;
        let request = self.client.get(url).bearer_auth(&self.api_key);
        let transaction_id = lookup.transaction_id.to_string();

        let transaction = guarded(&self.circuit_breaker, SERVICE, async move {
            let response = request.send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Err(UpstreamError::NotFound(transaction_id));
            }
            Ok(response.error_for_status()?.json::<ProviderTransaction>().await?)
        })
        .await?;

        tracing::debug!(
            intent_id = %lookup.intent_id,
            reference = %transaction.reference,
            status = %transaction.transaction_status,
            "Provider transaction fetched"
        );
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(intent_id: &'a str, transaction_id: &'a str) -> PaymentLookup<'a> {
        PaymentLookup {
            intent_id,
            transaction_id,
        }
    }

    #[tokio::test]
    async fn fetches_transaction_with_bearer_key() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v2/minikit/transaction/tx-1")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("app_id".into(), "app_test".into()),
                mockito::Matcher::UrlEncoded("type".into(), "payment".into()),
            ]))
            .match_header("authorization", "Bearer key_test")
            .with_body(r#"{"reference":"p1","transaction_status":"mined","transaction_hash":"0xabc"}"#)
            .create_async()
            .await;

        let verifier = DevPortalVerifier::new(server.url(), "app_test".into(), "key_test".into());
        let tx = verifier.lookup(lookup("p1", "tx-1")).await.unwrap();

        assert!(tx.confirms("p1"));
        assert_eq!(tx.transaction_hash.as_deref(), Some("0xabc"));
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v2/minikit/transaction/missing")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let verifier = DevPortalVerifier::new(server.url(), "app".into(), "key".into());
        assert!(matches!(
            verifier.lookup(lookup("p1", "missing")).await,
            Err(UpstreamError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_id_never_reaches_other_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let other = server
            .mock("GET", mockito::Matcher::Regex(r"^/api/v2/other".into()))
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"reference":"p1","transaction_status":"mined"}"#)
            .expect(0)
            .create_async()
            .await;

        let verifier = DevPortalVerifier::new(server.url(), "app_test".into(), "key_test".into());
        let result = verifier.lookup(lookup("p1", "../../other")).await;

        assert!(matches!(result, Err(UpstreamError::NotFound(_))));
        other.assert_async().await;
    }

    #[test]
    fn transaction_id_is_a_single_segment() {
        let verifier =
            DevPortalVerifier::new("http://portal.test/".into(), "app_test".into(), "key".into());
        let url = verifier.transaction_url("a/b?c").unwrap();

        assert_eq!(url.path(), "/api/v2/minikit/transaction/a%2Fb%3Fc");
        assert_eq!(url.query(), Some("app_id=app_test&type=payment"));
    }

    #[test]
    fn accepts_provider_style_ids() {
        assert!(is_transaction_id("0x3f9a_tx-01"));
        assert!(!is_transaction_id(".."));
        assert!(!is_transaction_id("tx 1"));
        assert!(!is_transaction_id(""));
    }

    #[tokio::test]
    async fn circuit_opens_after_repeated_failures() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", mockito::Matcher::Regex(r"^/api/v2/minikit/transaction/.*".into()))
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let verifier = DevPortalVerifier::new(server.url(), "app".into(), "key".into()).with_breaker(
            BreakerSettings {
                failure_threshold: 3,
                reset_timeout_secs: 60,
            },
        );

        for _ in 0..3 {
            let _ = verifier.lookup(lookup("p1", "tx-1")).await;
        }

        assert!(matches!(
            verifier.lookup(lookup("p1", "tx-1")).await,
            Err(UpstreamError::CircuitBreakerOpen(_))
        ));
    }
}
