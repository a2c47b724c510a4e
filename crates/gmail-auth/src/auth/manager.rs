//! Credential lifecycle across runs
//!
//! [`CredentialManager::obtain`] is the one call API clients make. It turns
//! whatever is on disk into an [`AuthenticatedTransport`], renewing the
//! stored credential or running the interactive flow as needed.

use super::provider::AuthProvider;
use super::token_store::CredentialStore;
use super::transport::AuthenticatedTransport;
use super::types::{AuthError, AuthResult, Credential};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Loads, renews and re-authorizes the persisted credential
pub struct CredentialManager {
    provider: Arc<dyn AuthProvider>,
    store: CredentialStore,
    http: reqwest::Client,
    cancel: CancellationToken,
}

impl CredentialManager {
    pub fn new(provider: Arc<dyn AuthProvider>, store: CredentialStore) -> Self {
        Self {
            provider,
            store,
            http: reqwest::Client::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Abandon `obtain`/`reauthorize` with [`AuthError::Cancelled`] when
    /// `cancel` fires, including while a token request is in flight
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Use a preconfigured HTTP client for the transport
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Produce a ready-to-use authenticated transport.
    ///
    /// A stored credential is always refreshed first; the recorded expiry is
    /// only advisory. When there is no usable credential, or the refresh is
    /// rejected, the interactive authorization runs instead.
    pub async fn obtain(&self) -> AuthResult<AuthenticatedTransport> {
        debug!("Obtaining credential from {}", self.store.path().display());

        let credential = self
            .cancellable(async {
                match self.store.load().await {
                    Ok(stored) => self.renew_or_reauthorize(stored).await,
                    Err(e) if e.is_missing_credential() => {
                        info!("No usable stored credential ({}), starting authorization", e);
                        self.authorize().await
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        Ok(self.transport(credential))
    }

    /// Ignore any stored credential and run the interactive flow
    pub async fn reauthorize(&self) -> AuthResult<AuthenticatedTransport> {
        info!("Forcing authorization with {}", self.provider.name());
        let credential = self.cancellable(self.authorize()).await?;
        Ok(self.transport(credential))
    }

    async fn cancellable<F>(&self, work: F) -> AuthResult<Credential>
    where
        F: Future<Output = AuthResult<Credential>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Authorization cancelled");
                Err(AuthError::Cancelled)
            }
            result = work => result,
        }
    }

    async fn renew_or_reauthorize(&self, stored: Credential) -> AuthResult<Credential> {
        if !stored.is_renewable() {
            info!("Stored credential has no refresh token, starting authorization");
            return self.authorize().await;
        }

        match self.provider.refresh(&stored).await {
            Ok(renewed) => {
                if renewed.access_token != stored.access_token {
                    self.store.save(&renewed).await?;
                    info!("Access token refreshed and saved");
                } else {
                    debug!("Provider returned the same access token");
                }
                Ok(renewed)
            }
            Err(e) => {
                warn!("Token refresh failed: {}, re-authorizing", e);
                self.authorize().await
            }
        }
    }

    /// The provider persists the credential before returning it
    async fn authorize(&self) -> AuthResult<Credential> {
        info!("Authorizing with {}", self.provider.name());
        self.provider.authenticate().await
    }

    fn transport(&self, credential: Credential) -> AuthenticatedTransport {
        AuthenticatedTransport::new(
            self.http.clone(),
            credential,
            Arc::clone(&self.provider),
            self.store.clone(),
        )
    }
}
