//! Wallet-auth nonces.
//!
//! A nonce is handed out twice: in the JSON body and in an HMAC-signed
//! `siwe` cookie. Completion requires both copies and a live server-side
//! entry to agree. Entries are single use.

use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const NONCE_COOKIE: &str = "siwe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NonceError {
    #[error("Missing nonce cookie")]
    MissingCookie,
    #[error("Nonce cookie signature is invalid")]
    BadSignature,
    #[error("Nonce does not match")]
    Mismatch,
    #[error("Nonce expired or already used")]
    Expired,
}

#[derive(Clone)]
pub struct NonceStore {
    ttl: Duration,
    issued: Arc<Mutex<HashMap<String, Instant>>>,
}

impl NonceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            issued: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 32 lowercase hex chars.
    pub async fn issue(&self) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        let now = Instant::now();

        let mut issued = self.issued.lock().await;
        self.prune(&mut issued, now);
        issued.insert(nonce.clone(), now);
        nonce
    }

    /// Removes the nonce. True only if it was issued and has not expired.
    /// Other expired entries are dropped on the way.
    pub async fn consume(&self, nonce: &str) -> bool {
        let now = Instant::now();
        let mut issued = self.issued.lock().await;
        let live = match issued.remove(nonce) {
            Some(at) => now.duration_since(at) < self.ttl,
            None => false,
        };
        self.prune(&mut issued, now);
        live
    }

    fn prune(&self, issued: &mut HashMap<String, Instant>, now: Instant) {
        issued.retain(|_, at| now.duration_since(*at) < self.ttl);
    }

    #[cfg(test)]
    async fn outstanding(&self) -> usize {
        self.issued.lock().await.len()
    }
}

fn mac_for(secret: &str, nonce: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(nonce.as_bytes());
    Some(mac)
}

/// `<nonce>.<hex hmac>`
pub fn sign_nonce(secret: &str, nonce: &str) -> String {
    let signature = mac_for(secret, nonce)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("{}.{}", nonce, signature)
}

/// Returns the nonce carried by a signed cookie value.
pub fn verify_cookie(secret: &str, value: &str) -> Result<String, NonceError> {
    let (nonce, signature) = value.rsplit_once('.').ok_or(NonceError::BadSignature)?;
    let signature = hex::decode(signature).map_err(|_| NonceError::BadSignature)?;
    let mac = mac_for(secret, nonce).ok_or(NonceError::BadSignature)?;
    mac.verify_slice(&signature)
        .map_err(|_| NonceError::BadSignature)?;
    Ok(nonce.to_string())
}

pub fn nonce_cookie(secret: &str, nonce: &str, ttl: Duration) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Strict",
        NONCE_COOKIE,
        sign_nonce(secret, nonce),
        ttl.as_secs()
    )
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Checks the cookie copy, the body copy and the store entry. The store entry
/// is consumed whenever the cookie is authentic, even if the body disagrees.
pub async fn check_nonce(
    store: &NonceStore,
    secret: &str,
    headers: &HeaderMap,
    body_nonce: &str,
) -> Result<(), NonceError> {
    let cookie = cookie_value(headers, NONCE_COOKIE).ok_or(NonceError::MissingCookie)?;
    let cookie_nonce = verify_cookie(secret, cookie)?;
    let live = store.consume(&cookie_nonce).await;

    if cookie_nonce != body_nonce {
        return Err(NonceError::Mismatch);
    }
    if !live {
        return Err(NonceError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[tokio::test]
    async fn nonces_are_32_hex_and_single_use() {
        let store = NonceStore::new(Duration::from_secs(60));
        let nonce = store.issue().await;

        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(store.consume(&nonce).await);
        assert!(!store.consume(&nonce).await);
    }

    #[tokio::test]
    async fn expired_nonce_is_rejected() {
        let store = NonceStore::new(Duration::from_millis(0));
        let nonce = store.issue().await;
        assert!(!store.consume(&nonce).await);
    }

    #[tokio::test]
    async fn consume_drops_expired_entries() {
        let store = NonceStore::new(Duration::from_millis(30));
        store.issue().await;
        store.issue().await;
        assert_eq!(store.outstanding().await, 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!store.consume("never-issued").await);
        assert_eq!(store.outstanding().await, 0);
    }

    #[test]
    fn cookie_signature_round_trips_and_detects_tampering() {
        let signed = sign_nonce(SECRET, "abc123");
        assert_eq!(verify_cookie(SECRET, &signed).unwrap(), "abc123");

        let forged = signed.replacen("abc123", "abc124", 1);
        assert_eq!(verify_cookie(SECRET, &forged), Err(NonceError::BadSignature));
        assert_eq!(verify_cookie("other-secret", &signed), Err(NonceError::BadSignature));
    }

    #[test]
    fn cookie_header_is_locked_down() {
        let cookie = nonce_cookie(SECRET, "abc", Duration::from_secs(3600));
        assert!(cookie.starts_with("siwe=abc."));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[tokio::test]
    async fn check_requires_all_three_to_agree() {
        let store = NonceStore::new(Duration::from_secs(60));
        let nonce = store.issue().await;
        let headers = headers_with(&format!("theme=dark; siwe={}", sign_nonce(SECRET, &nonce)));

        assert_eq!(
            check_nonce(&store, SECRET, &headers, "different").await,
            Err(NonceError::Mismatch)
        );
        // The mismatch burned the nonce.
        assert_eq!(
            check_nonce(&store, SECRET, &headers, &nonce).await,
            Err(NonceError::Expired)
        );

        let fresh = store.issue().await;
        let headers = headers_with(&format!("siwe={}", sign_nonce(SECRET, &fresh)));
        assert_eq!(check_nonce(&store, SECRET, &headers, &fresh).await, Ok(()));
        assert_eq!(
            check_nonce(&store, SECRET, &HeaderMap::new(), &fresh).await,
            Err(NonceError::MissingCookie)
        );
    }
}
