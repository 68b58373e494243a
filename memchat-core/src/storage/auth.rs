//! Bearer tokens for the Firestore REST API.
//!
//! The store asks its [`AccessTokenSource`] before every request, so a
//! source that refreshes on expiry keeps a long session authorized.

use super::StorageError;
use crate::config::constants::storage as storage_defaults;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const BACKEND: &str = "firestore";

#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Token for the next request, `None` to send it unauthenticated
    async fn access_token(&self) -> Result<Option<String>, StorageError>;
}

/// Fixed token, or none at all (the emulator accepts anonymous requests)
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token)
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials: a service account key file,
/// `gcloud auth application-default login`, or the metadata server.
/// Tokens are cached by the provider and refreshed before they expire.
pub struct ApplicationDefaultCredentials {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl ApplicationDefaultCredentials {
    pub async fn discover() -> Result<Self, StorageError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| StorageError::Connection {
                backend: BACKEND,
                message: format!("no Google Cloud credentials found: {e}"),
            })?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl AccessTokenSource for ApplicationDefaultCredentials {
    async fn access_token(&self) -> Result<Option<String>, StorageError> {
        let token = self
            .provider
            .token(&[storage_defaults::FIRESTORE_SCOPE])
            .await
            .map_err(|e| StorageError::Backend {
                backend: BACKEND,
                message: format!("failed to obtain access token: {e}"),
            })?;
        debug!("firestore access token ready");
        Ok(Some(token.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_unchanged() {
        let source = StaticToken::new(Some("abc".to_string()));
        assert_eq!(source.access_token().await.unwrap().as_deref(), Some("abc"));
        assert!(StaticToken::anonymous().access_token().await.unwrap().is_none());
    }
}
