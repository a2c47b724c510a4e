//! Installed-application authorization code flow
//!
//! One [`OAuthFlow`] drives one authorization attempt:
//!
//! ```text
//! Idle -> ListenerStarting -> AwaitingRedirect -> Exchanging -> Authorized
//!                 \                  \                \
//!                  `------------------`----------------`--> Failed(reason)
//! ```
//!
//! While awaiting the redirect the flow races the callback listener against
//! the timeout and the process cancellation token; the code exchange is
//! raced against the cancellation token too. The listener is torn down on
//! every exit path and nothing is persisted unless the code exchange
//! succeeded.

use super::browser::{print_authorization_url, UrlOpener};
use super::callback_server::{CallbackServer, RunningCallbackServer};
use super::oauth_client::OAuthClient;
use super::state_token::StateToken;
use super::token_store::CredentialStore;
use super::types::{AuthError, AuthResult, CallbackResult, Credential, FlowSettings};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why an attempt ended in [`FlowState::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    StateMismatch,
    ServerError,
    ExchangeError,
    ProviderDenied,
    Cancelled,
    PersistError,
    EntropyUnavailable,
    ConfigError,
}

impl From<&AuthError> for FailureReason {
    fn from(error: &AuthError) -> Self {
        match error {
            AuthError::Timeout(_) => FailureReason::Timeout,
            AuthError::StateMismatch => FailureReason::StateMismatch,
            AuthError::ListenerBindError { .. } | AuthError::ListenerError(_) => {
                FailureReason::ServerError
            }
            AuthError::ExchangeError(_) | AuthError::RefreshError(_) => {
                FailureReason::ExchangeError
            }
            AuthError::ProviderDenied(_) => FailureReason::ProviderDenied,
            AuthError::Cancelled => FailureReason::Cancelled,
            AuthError::PersistError { .. }
            | AuthError::NotFound(_)
            | AuthError::Corrupt { .. } => FailureReason::PersistError,
            AuthError::EntropyUnavailable(_) => FailureReason::EntropyUnavailable,
            AuthError::ConfigError(_) => FailureReason::ConfigError,
        }
    }
}

/// Lifecycle of one authorization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    ListenerStarting,
    AwaitingRedirect,
    Exchanging,
    Authorized,
    Failed(FailureReason),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Authorized | FlowState::Failed(_))
    }
}

/// One interactive authorization attempt
pub struct OAuthFlow {
    client: OAuthClient,
    settings: FlowSettings,
    store: CredentialStore,
    opener: Arc<dyn UrlOpener>,
    cancel: CancellationToken,
    state: FlowState,
}

impl OAuthFlow {
    /// Create a new OAuth flow instance
    pub fn new(
        client: OAuthClient,
        settings: FlowSettings,
        store: CredentialStore,
        opener: Arc<dyn UrlOpener>,
        cancel: CancellationToken,
    ) -> Self {
        debug!(
            "Initializing OAuth flow with client_id: {}",
            client.config().client_id
        );
        Self {
            client,
            settings,
            store,
            opener,
            cancel,
            state: FlowState::Idle,
        }
    }

    /// Current state of the attempt
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Run the attempt to completion.
    ///
    /// On success the credential has already been persisted. A flow can only
    /// run once; create a new one for another attempt.
    pub async fn run(&mut self) -> AuthResult<Credential> {
        if self.state != FlowState::Idle {
            return Err(AuthError::ConfigError(
                "authorization attempt already used".to_string(),
            ));
        }

        let result = self.drive().await;
        if let Err(e) = &result {
            warn!("Authorization attempt failed: {}", e);
            self.transition(FlowState::Failed(FailureReason::from(e)));
        }
        result
    }

    async fn drive(&mut self) -> AuthResult<Credential> {
        self.transition(FlowState::ListenerStarting);
        let mut server =
            CallbackServer::new(self.settings.callback_port, self.settings.shutdown_grace)
                .start()
                .await?;

        self.transition(FlowState::AwaitingRedirect);
        let redirect_uri = server.redirect_uri();
        let outcome = self.await_redirect(&mut server, &redirect_uri).await;
        server.shutdown().await;
        let code = outcome?;

        self.transition(FlowState::Exchanging);
        let credential = tokio::select! {
            result = self.client.exchange_code(&redirect_uri, &code) => result?,
            _ = self.cancel.cancelled() => return Err(AuthError::Cancelled),
        };

        self.store.save(&credential).await?;
        self.transition(FlowState::Authorized);
        info!("OAuth flow completed successfully");
        Ok(credential)
    }

    /// Issue the state token, surface the URL and wait for exactly one of:
    /// redirect, listener failure, timeout or cancellation.
    async fn await_redirect(
        &self,
        server: &mut RunningCallbackServer,
        redirect_uri: &str,
    ) -> AuthResult<String> {
        let state_token = StateToken::generate()?;
        let auth_url = self.client.authorize_url(redirect_uri, &state_token)?;

        debug!("Issued state token ({} chars)", state_token.as_str().len());
        info!("Waiting for the authorization redirect on {}", redirect_uri);
        print_authorization_url(auth_url.as_str());
        if let Err(e) = self.opener.open(auth_url.as_str()) {
            warn!("Failed to open browser: {}", e);
        }

        let timeout = self.settings.callback_timeout;
        let callback = tokio::select! {
            result = server.wait_for_callback() => result?,
            _ = tokio::time::sleep(timeout) => return Err(AuthError::Timeout(timeout)),
            _ = self.cancel.cancelled() => return Err(AuthError::Cancelled),
        };

        match callback {
            CallbackResult::Code { code, state } => {
                if !state_token.matches(&state) {
                    return Err(AuthError::StateMismatch);
                }
                Ok(code)
            }
            CallbackResult::Denied { error, description } => Err(AuthError::ProviderDenied(
                description.map_or(error.clone(), |d| format!("{}: {}", error, d)),
            )),
        }
    }

    fn transition(&mut self, next: FlowState) {
        debug!("Authorization state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
