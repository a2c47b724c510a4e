//! Authentication provider trait and the installed-application provider
//!
//! The [`CredentialManager`](super::CredentialManager) only talks to an
//! [`AuthProvider`]; the interactive flow and the refresh call live behind it.

use super::browser::{SystemBrowser, UrlOpener};
use super::oauth_client::OAuthClient;
use super::oauth_flow::OAuthFlow;
use super::token_store::CredentialStore;
use super::types::{AuthResult, ClientConfig, Credential, FlowSettings};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Core trait for authentication providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Run the interactive authorization flow.
    ///
    /// The returned credential has already been persisted by the provider.
    async fn authenticate(&self) -> AuthResult<Credential>;

    /// Exchange the credential's refresh token for a new access token.
    ///
    /// Does not persist; the caller decides whether the result changed.
    async fn refresh(&self, credential: &Credential) -> AuthResult<Credential>;

    /// Get provider name for logging/debugging
    fn name(&self) -> &str;
}

/// Provider for the browser based installed-application flow
pub struct InstalledAppProvider {
    client: ClientConfig,
    settings: FlowSettings,
    store: CredentialStore,
    opener: Arc<dyn UrlOpener>,
    cancel: CancellationToken,
}

impl InstalledAppProvider {
    pub fn new(client: ClientConfig, settings: FlowSettings, store: CredentialStore) -> Self {
        Self {
            client,
            settings,
            store,
            opener: Arc::new(SystemBrowser::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the browser launcher
    pub fn with_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Abort a pending authorization when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn oauth_client(&self) -> AuthResult<OAuthClient> {
        OAuthClient::new(self.client.clone())
    }
}

#[async_trait]
impl AuthProvider for InstalledAppProvider {
    async fn authenticate(&self) -> AuthResult<Credential> {
        let mut flow = OAuthFlow::new(
            self.oauth_client()?,
            self.settings.clone(),
            self.store.clone(),
            Arc::clone(&self.opener),
            self.cancel.clone(),
        );
        flow.run().await
    }

    async fn refresh(&self, credential: &Credential) -> AuthResult<Credential> {
        self.oauth_client()?.refresh(credential).await
    }

    fn name(&self) -> &str {
        "installed-app"
    }
}
