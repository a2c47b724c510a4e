//! Authentication-related types and data structures
//!
//! This module defines the types shared by the auth module: client
//! configuration, flow settings, the persisted credential and the error type.

use chrono::{DateTime, Utc};
use gmail_common::{
    DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT_SECS, DEFAULT_SHUTDOWN_GRACE_SECS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// OAuth client registration, loaded once from the client secrets file
#[derive(Clone)]
pub struct ClientConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (installed applications still receive one)
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_endpoint: String,
    /// Token endpoint URL
    pub token_endpoint: String,
    /// Scopes to request
    pub scopes: Vec<String>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_endpoint", &self.auth_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Tunables for one interactive authorization attempt
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Local port the callback listener binds to. `0` picks an ephemeral port.
    pub callback_port: u16,
    /// How long to wait for the redirect
    pub callback_timeout: Duration,
    /// Grace period for in-flight connections when the listener shuts down
    pub shutdown_grace: Duration,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            callback_port: DEFAULT_CALLBACK_PORT,
            callback_timeout: Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }
}

impl FlowSettings {
    /// Redirect URI registered with the provider for a listener on `port`
    pub fn redirect_uri_for(port: u16) -> String {
        format!("http://localhost:{port}")
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Persisted OAuth credential
///
/// The JSON shape (`access_token`, `token_type`, `refresh_token`, `expiry`
/// as RFC 3339) matches the `token.json` files written by other Google OAuth
/// clients, so existing files keep loading.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived access token
    pub access_token: String,
    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Long-lived refresh token, if the provider issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token stops being valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create a credential from a token endpoint response
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<Duration>,
    ) -> Self {
        // lifetimes past the representable range are kept without an expiry
        let expiry = expires_in
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .and_then(|d| Utc::now().checked_add_signed(d));

        Self {
            access_token,
            token_type: default_token_type(),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expiry,
        }
    }

    /// A refresh token is present, so the credential outlives its access token
    pub fn is_renewable(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Check if the access token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }

    /// Check if the access token expires within the specified duration.
    ///
    /// A credential without a recorded expiry never reports as expiring.
    pub fn expires_within(&self, margin: Duration) -> bool {
        let Some(expiry) = self.expiry else {
            return false;
        };
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::MAX);
        match Utc::now().checked_add_signed(margin) {
            Some(threshold) => expiry <= threshold,
            None => true,
        }
    }

    /// Get time until token expiration
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expiry
            .map(|expiry| (expiry - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// What the callback listener received from the browser redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    /// The provider redirected back with an authorization code
    Code { code: String, state: String },
    /// The provider redirected back with an `error` parameter
    Denied {
        error: String,
        description: Option<String>,
    },
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The OS random source could not supply bytes for the state token
    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(String),

    /// The callback listener could not bind its port
    #[error("Failed to bind callback listener on {addr}: {source}")]
    ListenerBindError {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The callback listener failed after binding
    #[error("Callback listener error: {0}")]
    ListenerError(String),

    /// No redirect arrived in time
    #[error("Authorization timeout - no response received within {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The redirect carried a state token other than the one we issued
    #[error("Invalid state token received, the authorization callback was rejected")]
    StateMismatch,

    /// The provider redirected back with an error
    #[error("Authorization denied by provider: {0}")]
    ProviderDenied(String),

    /// Authorization code could not be exchanged for a credential
    #[error("Token exchange failed: {0}")]
    ExchangeError(String),

    /// Refresh token was rejected or the refresh request failed
    #[error("Token refresh failed: {0}")]
    RefreshError(String),

    /// Credential could not be written
    #[error("Failed to persist credential to {}: {source}", .path.display())]
    PersistError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No credential file
    #[error("No credential found at {}", .0.display())]
    NotFound(PathBuf),

    /// Credential file exists but cannot be decoded
    #[error("Credential file {} is unreadable: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The process was interrupted while waiting for the redirect
    #[error("Authorization cancelled")]
    Cancelled,

    /// Invalid client secrets or endpoints
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AuthError {
    /// `NotFound` and `Corrupt` both mean "no usable stored credential"
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, AuthError::NotFound(_) | AuthError::Corrupt { .. })
    }
}
