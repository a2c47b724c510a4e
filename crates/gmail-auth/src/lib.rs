//! # gmail-auth
//!
//! Authorization and credential lifecycle for command-line tools that talk to
//! the Gmail API on behalf of a desktop user.
//!
//! The entry point is [`CredentialManager::obtain`]: it loads the persisted
//! credential, renews it against the provider and falls back to the
//! interactive installed-application flow (browser + local callback listener)
//! whenever no usable credential is available. The result is an
//! [`AuthenticatedTransport`] that signs outgoing requests.
//!
//! ```no_run
//! use gmail_auth::{CredentialManager, CredentialStore, FlowSettings, InstalledAppProvider};
//! use gmail_auth::auth::client_secrets::load_client_config;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> gmail_auth::AuthResult<()> {
//! let client = load_client_config(
//!     Path::new("credentials.json"),
//!     &[gmail_common::GMAIL_READONLY_SCOPE.to_string()],
//! )
//! .await?;
//! let store = CredentialStore::new("token.json");
//! let provider = InstalledAppProvider::new(client, FlowSettings::default(), store.clone());
//! let manager = CredentialManager::new(Arc::new(provider), store);
//!
//! let transport = manager.obtain().await?;
//! let labels = transport
//!     .get("https://gmail.googleapis.com/gmail/v1/users/me/labels")
//!     .await?
//!     .send()
//!     .await;
//! # let _ = labels;
//! # Ok(())
//! # }
//! ```

pub mod auth;

pub use auth::{
    AuthError, AuthProvider, AuthResult, AuthenticatedTransport, ClientConfig, Credential,
    CredentialManager, CredentialStore, FlowSettings, InstalledAppProvider,
};
