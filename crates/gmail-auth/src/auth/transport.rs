//! HTTP transport that signs requests with the current access token

use super::provider::AuthProvider;
use super::token_store::CredentialStore;
use super::types::{AuthResult, Credential};
use gmail_common::TOKEN_EXPIRY_MARGIN_SECS;
use reqwest::{Client, IntoUrl, Method, RequestBuilder};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

struct TransportInner {
    credential: RwLock<Credential>,
    provider: Arc<dyn AuthProvider>,
    store: CredentialStore,
}

/// Authenticated HTTP transport handed to API clients.
///
/// Cheap to clone; clones share the credential. When the access token is
/// about to expire and a refresh token is available the transport renews it
/// before signing the next request and persists the rotated credential.
#[derive(Clone)]
pub struct AuthenticatedTransport {
    http: Client,
    inner: Arc<TransportInner>,
}

impl AuthenticatedTransport {
    pub fn new(
        http: Client,
        credential: Credential,
        provider: Arc<dyn AuthProvider>,
        store: CredentialStore,
    ) -> Self {
        Self {
            http,
            inner: Arc::new(TransportInner {
                credential: RwLock::new(credential),
                provider,
                store,
            }),
        }
    }

    /// Snapshot of the credential currently in use
    pub async fn credential(&self) -> Credential {
        self.inner.credential.read().await.clone()
    }

    /// Underlying HTTP client, for requests that need no authorization
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// Current access token, renewed first if it is about to expire
    pub async fn access_token(&self) -> AuthResult<String> {
        let margin = Duration::from_secs(TOKEN_EXPIRY_MARGIN_SECS);

        {
            let credential = self.inner.credential.read().await;
            if !needs_renewal(&credential, margin) {
                return Ok(credential.access_token.clone());
            }
        }

        let mut credential = self.inner.credential.write().await;
        // another clone may have renewed while we waited for the lock
        if !needs_renewal(&credential, margin) {
            return Ok(credential.access_token.clone());
        }

        debug!("Access token expiring soon, refreshing");
        let renewed = self.inner.provider.refresh(&credential).await?;
        if renewed.access_token != credential.access_token {
            self.inner.store.save(&renewed).await?;
            info!("Access token renewed");
        }
        *credential = renewed;
        Ok(credential.access_token.clone())
    }

    /// Start a request carrying `Authorization: Bearer <token>`
    pub async fn request<U: IntoUrl>(&self, method: Method, url: U) -> AuthResult<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    pub async fn get<U: IntoUrl>(&self, url: U) -> AuthResult<RequestBuilder> {
        self.request(Method::GET, url).await
    }
}

impl fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedTransport")
            .field("provider", &self.inner.provider.name())
            .field("store", &self.inner.store.path())
            .finish_non_exhaustive()
    }
}

fn needs_renewal(credential: &Credential, margin: Duration) -> bool {
    credential.is_renewable() && credential.expires_within(margin)
}
