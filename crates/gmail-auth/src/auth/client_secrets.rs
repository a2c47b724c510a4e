//! Loading the OAuth client registration
//!
//! Reads the client secrets JSON downloaded from the Google Cloud console.
//! Desktop clients are stored under `installed`, web clients under `web`.

use super::types::{AuthError, AuthResult, ClientConfig};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecretsEntry>,
    web: Option<ClientSecretsEntry>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsEntry {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// Read and parse the client secrets file at `path`
pub async fn load_client_config(path: &Path, scopes: &[String]) -> AuthResult<ClientConfig> {
    debug!("Loading client secrets from {}", path.display());

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        AuthError::ConfigError(format!(
            "Unable to read client secrets file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_client_config(&content, scopes)
}

/// Parse client secrets JSON into a [`ClientConfig`] requesting `scopes`
pub fn parse_client_config(json: &str, scopes: &[String]) -> AuthResult<ClientConfig> {
    let file: ClientSecretsFile = serde_json::from_str(json)
        .map_err(|e| AuthError::ConfigError(format!("Malformed client secrets: {}", e)))?;

    let entry = file.installed.or(file.web).ok_or_else(|| {
        AuthError::ConfigError(
            "Client secrets must contain an \"installed\" or \"web\" section".to_string(),
        )
    })?;

    if scopes.is_empty() {
        return Err(AuthError::ConfigError(
            "At least one scope must be requested".to_string(),
        ));
    }

    Ok(ClientConfig {
        client_id: required(entry.client_id, "client_id")?,
        client_secret: required(entry.client_secret, "client_secret")?,
        auth_endpoint: endpoint(entry.auth_uri, "auth_uri")?,
        token_endpoint: endpoint(entry.token_uri, "token_uri")?,
        scopes: scopes.to_vec(),
    })
}

fn required(value: Option<String>, field: &str) -> AuthResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::ConfigError(format!("Client secrets missing {}", field)))
}

fn endpoint(value: Option<String>, field: &str) -> AuthResult<String> {
    let value = required(value, field)?;
    let url = Url::parse(&value)
        .map_err(|e| AuthError::ConfigError(format!("Invalid {} '{}': {}", field, value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AuthError::ConfigError(format!(
            "Invalid {} '{}': expected an http(s) URL",
            field, value
        )));
    }
    Ok(value)
}
