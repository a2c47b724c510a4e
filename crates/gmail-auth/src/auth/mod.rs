//! Authentication module
//!
//! This module provides the installed-application OAuth 2.0 flow for Gmail:
//! - CSRF state token generation
//! - Local HTTP callback listener for the provider redirect
//! - Authorization orchestration with timeout and cancellation
//! - Credential persistence with owner-only file permissions
//! - Transparent refresh and an authenticated HTTP transport

pub mod browser;
pub mod callback_server;
pub mod client_secrets;
pub mod manager;
pub mod oauth_client;
pub mod oauth_flow;
pub mod provider;
pub mod state_token;
pub mod token_store;
pub mod transport;
pub mod types;

pub use browser::{SystemBrowser, UrlOpener};
pub use manager::CredentialManager;
pub use oauth_flow::{FailureReason, FlowState, OAuthFlow};
pub use provider::{AuthProvider, InstalledAppProvider};
pub use state_token::StateToken;
pub use token_store::CredentialStore;
pub use transport::AuthenticatedTransport;
pub use types::{AuthError, AuthResult, ClientConfig, Credential, FlowSettings};
