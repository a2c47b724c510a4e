//! Error types for the gmail-auth CLI

use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or environment issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication/authorization issues
    #[error(transparent)]
    Auth(#[from] gmail_auth::AuthError),
}

impl From<figment::Error> for CliError {
    fn from(error: figment::Error) -> Self {
        CliError::Config(error.to_string())
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
