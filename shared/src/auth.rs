//! Bearer-token acquisition for the Bot Framework connector.
//!
//! Two strategies, selected by whether a token store is configured:
//! with a store, `authenticate(false)` serves the cached token and only a
//! forced refresh performs the OAuth2 client-credentials exchange; without
//! one, every call exchanges credentials. Cache failures degrade to an empty
//! token so a rejected reply can trigger the one-shot forced-refresh retry.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::cache::{TokenRecord, TokenStore};
use crate::secrets::SecretResolver;
use crate::{Error, Result};

/// Identity-provider token endpoint.
const TOKEN_ENDPOINT: &str =
    "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token";

/// Scope requested for connector calls.
const BOT_FRAMEWORK_SCOPE: &str = "https://api.botframework.com/.default";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Obtains bearer tokens for posting replies.
pub struct Authenticator {
    resolver: SecretResolver,
    store: Option<Arc<dyn TokenStore>>,
    http: reqwest::Client,
    token_url: String,
    client_id_cipher: String,
    client_secret_cipher: String,
}

impl Authenticator {
    pub fn new(
        resolver: SecretResolver,
        store: Option<Arc<dyn TokenStore>>,
        http: reqwest::Client,
        client_id_cipher: String,
        client_secret_cipher: String,
    ) -> Self {
        Self {
            resolver,
            store,
            http,
            token_url: TOKEN_ENDPOINT.to_string(),
            client_id_cipher,
            client_secret_cipher,
        }
    }

    /// Override the token endpoint. Used by tests.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Return a bearer token, possibly empty.
    ///
    /// Without `force_refresh` the cached token is served when a store is
    /// configured; a missing record or a store failure yields an empty token
    /// rather than an error. `force_refresh` (and the store-less strategy)
    /// always performs the credentials exchange.
    pub async fn authenticate(&self, force_refresh: bool) -> Result<String> {
        if let (Some(store), false) = (&self.store, force_refresh) {
            let token = match store.read().await {
                Ok(Some(record)) => record.token,
                Ok(None) => {
                    warn!("no cached token, proceeding with an empty bearer");
                    String::new()
                }
                Err(err) => {
                    warn!(error = %err, "token cache read failed, treating as no token");
                    String::new()
                }
            };
            return Ok(token);
        }

        self.refresh().await
    }

    /// Exchange client credentials for a fresh token and persist it.
    async fn refresh(&self) -> Result<String> {
        let client_id = self.resolver.decrypt(&self.client_id_cipher).await?;
        let client_secret = self.resolver.decrypt(&self.client_secret_cipher).await?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", BOT_FRAMEWORK_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "Token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Malformed token response: {}", e)))?;

        if let Some(store) = &self.store {
            let record = TokenRecord {
                token: token.access_token.clone(),
                created: Utc::now(),
            };
            // The fresh token is still good even if persisting it fails.
            if let Err(err) = store.write(&record).await {
                warn!(error = %err, "failed to persist refreshed token");
            }
        }

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTokenStore;
    use async_trait::async_trait;
    use mockito::Matcher;

    struct FailingStore;

    #[async_trait]
    impl TokenStore for FailingStore {
        async fn read(&self) -> Result<Option<TokenRecord>> {
            Err(Error::Aws("store unavailable".to_string()))
        }

        async fn write(&self, _record: &TokenRecord) -> Result<()> {
            Err(Error::Aws("store unavailable".to_string()))
        }
    }

    fn authenticator(
        store: Option<Arc<dyn TokenStore>>,
        token_url: impl Into<String>,
    ) -> Authenticator {
        Authenticator::new(
            SecretResolver::plaintext(),
            store,
            reqwest::Client::new(),
            "client-id".to_string(),
            "client-secret".to_string(),
        )
        .with_token_url(token_url)
    }

    async fn seeded_store(token: &str) -> Arc<MemoryTokenStore> {
        let store = Arc::new(MemoryTokenStore::default());
        store
            .write(&TokenRecord {
                token: token.to_string(),
                created: Utc::now(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn cached_read_is_idempotent() {
        let store = seeded_store("cached-token").await;
        // Unroutable endpoint proves the cache path never touches the network.
        let auth = authenticator(Some(store), "http://127.0.0.1:1/token");

        assert_eq!(auth.authenticate(false).await.unwrap(), "cached-token");
        assert_eq!(auth.authenticate(false).await.unwrap(), "cached-token");
    }

    #[tokio::test]
    async fn missing_record_yields_empty_token() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::default());
        let auth = authenticator(Some(store), "http://127.0.0.1:1/token");

        assert_eq!(auth.authenticate(false).await.unwrap(), "");
    }

    #[tokio::test]
    async fn store_failure_yields_empty_token() {
        let auth = authenticator(Some(Arc::new(FailingStore)), "http://127.0.0.1:1/token");

        assert_eq!(auth.authenticate(false).await.unwrap(), "");
    }

    #[tokio::test]
    async fn forced_refresh_exchanges_and_persists() {
        let mut server = mockito::Server::new_async().await;
        let exchange = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "client-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
                Matcher::UrlEncoded("scope".into(), BOT_FRAMEWORK_SCOPE.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"fresh-token","token_type":"Bearer","expires_in":3599}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryTokenStore::default());
        let auth = authenticator(Some(store.clone()), format!("{}/token", server.url()));

        assert_eq!(auth.authenticate(true).await.unwrap(), "fresh-token");
        assert_eq!(store.read().await.unwrap().unwrap().token, "fresh-token");
        exchange.assert_async().await;
    }

    #[tokio::test]
    async fn store_less_strategy_exchanges_every_time() {
        let mut server = mockito::Server::new_async().await;
        let exchange = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"fresh-token"}"#)
            .expect(2)
            .create_async()
            .await;

        let auth = authenticator(None, format!("{}/token", server.url()));

        assert_eq!(auth.authenticate(false).await.unwrap(), "fresh-token");
        assert_eq!(auth.authenticate(false).await.unwrap(), "fresh-token");
        exchange.assert_async().await;
    }

    #[tokio::test]
    async fn failed_exchange_is_an_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(500)
            .create_async()
            .await;

        let auth = authenticator(None, format!("{}/token", server.url()));

        assert!(matches!(
            auth.authenticate(true).await,
            Err(Error::Auth(_))
        ));
    }
}
