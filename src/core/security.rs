use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::errors::ApiError;

const API_KEY_HEADER: &str = "x-api-key";

/// A freshly issued API key with its expiry (unix seconds).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Abstraction over the API-key backend so handlers and tests never touch
/// process-wide state.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Check whether the key is known and unexpired.
    async fn validate(&self, key: &str) -> bool;

    /// User id associated with a valid key, if any.
    async fn user_for_key(&self, key: &str) -> Option<String>;

    /// Issue a new TTL-bound key for a user.
    async fn issue(&self, user_id: &str, role: &str, ttl: Duration) -> IssuedToken;
}

#[derive(Debug, Clone)]
struct KeyRecord {
    user_id: String,
    #[allow(dead_code)]
    role: String,
    expires_at: i64,
}

/// In-memory key store. Issued keys live behind an `RwLock`; an optional
/// static default key (from config or `DEFAULT_API_KEY`) is compared in
/// constant time.
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<String, KeyRecord>>,
    default_key: Option<String>,
}

impl InMemoryKeyStore {
    pub fn new(default_key: Option<String>) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            default_key,
        }
    }

    fn matches_default(&self, key: &str) -> bool {
        match &self.default_key {
            Some(expected) => expected.as_bytes().ct_eq(key.as_bytes()).into(),
            None => false,
        }
    }
}

#[async_trait]
impl ApiKeyStore for InMemoryKeyStore {
    async fn validate(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }

        if self.matches_default(key) {
            return true;
        }

        let keys = self.keys.read().await;
        match keys.get(key) {
            Some(record) => {
                if record.expires_at > Utc::now().timestamp() {
                    true
                } else {
                    tracing::warn!("Expired API key used");
                    false
                }
            }
            None => false,
        }
    }

    async fn user_for_key(&self, key: &str) -> Option<String> {
        let keys = self.keys.read().await;
        keys.get(key)
            .filter(|record| record.expires_at > Utc::now().timestamp())
            .map(|record| record.user_id.clone())
    }

    async fn issue(&self, user_id: &str, role: &str, ttl: Duration) -> IssuedToken {
        let token = format!("api-key-{}", Uuid::new_v4());
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;

        let mut keys = self.keys.write().await;
        keys.insert(
            token.clone(),
            KeyRecord {
                user_id: user_id.to_string(),
                role: role.to_string(),
                expires_at,
            },
        );

        IssuedToken { token, expires_at }
    }
}

/// Reject the request unless the `x-api-key` header carries a valid key.
pub async fn require_api_key(
    headers: &HeaderMap,
    store: &Arc<dyn ApiKeyStore>,
) -> Result<(), ApiError> {
    let header_value = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header_value.is_empty() {
        tracing::warn!("Missing API key");
        return Err(ApiError::Unauthorized);
    }

    if !store.validate(header_value).await {
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn store_with_default(key: &str) -> Arc<dyn ApiKeyStore> {
        Arc::new(InMemoryKeyStore::new(Some(key.to_string())))
    }

    #[tokio::test]
    async fn require_api_key_accepts_valid_header() {
        let store = store_with_default("secret");
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("secret"));

        assert!(require_api_key(&headers, &store).await.is_ok());
    }

    #[tokio::test]
    async fn require_api_key_rejects_missing_or_invalid_header() {
        let store = store_with_default("secret");

        let missing = require_api_key(&HeaderMap::new(), &store).await;
        assert!(matches!(missing, Err(ApiError::Unauthorized)));

        let mut invalid_headers = HeaderMap::new();
        invalid_headers.insert(API_KEY_HEADER, HeaderValue::from_static("wrong"));
        let invalid = require_api_key(&invalid_headers, &store).await;
        assert!(matches!(invalid, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn issued_tokens_validate_and_resolve_user() {
        let store = InMemoryKeyStore::new(None);
        let issued = store
            .issue("demo_user", "user", Duration::from_secs(3600))
            .await;

        assert!(issued.token.starts_with("api-key-"));
        assert!(store.validate(&issued.token).await);
        assert_eq!(
            store.user_for_key(&issued.token).await.as_deref(),
            Some("demo_user")
        );
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let store = InMemoryKeyStore::new(None);
        let issued = store.issue("demo_user", "user", Duration::ZERO).await;

        assert!(!store.validate(&issued.token).await);
        assert_eq!(store.user_for_key(&issued.token).await, None);
    }

    #[tokio::test]
    async fn require_api_key_rejects_non_utf8_header_value() {
        let store = store_with_default("secret");
        let mut headers = HeaderMap::new();
        let non_utf8 = HeaderValue::from_bytes(&[0xFF, 0xFE, 0xFD])
            .expect("header value bytes should be accepted");
        headers.insert(API_KEY_HEADER, non_utf8);

        let result = require_api_key(&headers, &store).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }
}
