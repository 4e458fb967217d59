use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{guarded, http_client, Breaker, BreakerSettings};
use super::{SignatureVerifier, SiweVerification, UpstreamError};

const SERVICE: &str = "siwe-verifier";

/// Posts `{payload, nonce}` to an external SIWE verification endpoint.
#[derive(Clone)]
pub struct HttpSignatureVerifier {
    client: Client,
    url: String,
    circuit_breaker: Breaker,
}

impl HttpSignatureVerifier {
    pub fn new(url: String) -> Self {
        Self {
            client: http_client(),
            url,
            circuit_breaker: BreakerSettings::default().build(),
        }
    }
}

#[async_trait]
impl SignatureVerifier for HttpSignatureVerifier {
    async fn verify(&self, payload: &Value, nonce: &str) -> Result<SiweVerification, UpstreamError> {
        let request = self
            .client
            .post(&self.url)
            .json(&json!({ "payload": payload, "nonce": nonce }));

        let mut verification = guarded(&self.circuit_breaker, SERVICE, async move {
            let response = request.send().await?.error_for_status()?;
            Ok(response.json::<SiweVerification>().await?)
        })
        .await?;

        if verification.address.is_none() {
            verification.address = payload["address"].as_str().map(str::to_string);
        }
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_payload_address() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/verify")
            .match_body(mockito::Matcher::PartialJson(json!({"nonce": "abc"})))
            .with_body(r#"{"isValid":true}"#)
            .create_async()
            .await;

        let verifier = HttpSignatureVerifier::new(format!("{}/verify", server.url()));
        let payload = json!({"address": "0xabc", "message": "m", "signature": "s"});
        let result = verifier.verify(&payload, "abc").await.unwrap();

        assert!(result.is_valid);
        assert_eq!(result.address.as_deref(), Some("0xabc"));
    }

    #[tokio::test]
    async fn reports_invalid_signature() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/verify")
            .with_body(r#"{"is_valid":false}"#)
            .create_async()
            .await;

        let verifier = HttpSignatureVerifier::new(format!("{}/verify", server.url()));
        let result = verifier.verify(&json!({}), "abc").await.unwrap();
        assert!(!result.is_valid);
    }
}
