//! Authorization command handlers

use crate::config::CliConfig;
use crate::error::Result;
use crate::output::{compress_path, print_error, print_field, print_info, print_success};
use crate::shutdown::cancel_on_signal;
use chrono::Utc;
use gmail_auth::auth::client_secrets::load_client_config;
use gmail_auth::auth::SystemBrowser;
use gmail_auth::{AuthError, Credential, CredentialManager, CredentialStore, InstalledAppProvider};
use std::sync::Arc;
use tracing::debug;

/// Obtain a working credential, running the browser flow when needed
pub async fn handle_auth(config: &CliConfig, force: bool) -> Result<()> {
    debug!("Using client secrets {}", config.credentials_file.display());
    let client = load_client_config(&config.credentials_file, &config.scopes).await?;

    let cancel = cancel_on_signal();
    let store = CredentialStore::new(&config.token_file);
    let provider = InstalledAppProvider::new(client, config.flow_settings(), store.clone())
        .with_opener(Arc::new(SystemBrowser::new(config.open_browser)))
        .with_cancellation(cancel.clone());
    let manager = CredentialManager::new(Arc::new(provider), store).with_cancellation(cancel);

    let transport = if force {
        manager.reauthorize().await?
    } else {
        manager.obtain().await?
    };

    let credential = transport.credential().await;
    print_success("Gmail access authorized");
    print_info(&format!(
        "Credential saved to {}",
        compress_path(&config.token_file)
    ));
    if let Some(expiry) = describe_expiry(&credential) {
        print_field("Access token", &expiry);
    }
    Ok(())
}

/// Report the stored credential without any network access
pub async fn handle_status(config: &CliConfig) -> Result<()> {
    let store = CredentialStore::new(&config.token_file);
    let path = compress_path(store.path());

    match store.load().await {
        Ok(credential) => {
            print_success(&format!("Credential found at {}", path));
            print_field(
                "Access token",
                &describe_expiry(&credential).unwrap_or_else(|| "no recorded expiry".into()),
            );
            print_field(
                "Refresh token",
                if credential.is_renewable() {
                    "present (renews automatically)"
                } else {
                    "absent (re-authorization required when the access token expires)"
                },
            );
            Ok(())
        }
        Err(AuthError::NotFound(_)) => {
            print_info(&format!(
                "Not authorized: no credential at {}. Run `gmail-auth auth` to authorize.",
                path
            ));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Stored credential is unusable: {}", e));
            Err(e.into())
        }
    }
}

/// Remove the stored credential
pub async fn handle_logout(config: &CliConfig) -> Result<()> {
    let store = CredentialStore::new(&config.token_file);
    if store.clear().await? {
        print_success(&format!(
            "Removed credential {}",
            compress_path(store.path())
        ));
    } else {
        print_info("No stored credential to remove");
    }
    Ok(())
}

fn describe_expiry(credential: &Credential) -> Option<String> {
    let expiry = credential.expiry?;
    let local = expiry.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S");
    if expiry <= Utc::now() {
        return Some(format!("expired at {}", local));
    }
    let minutes = credential
        .time_until_expiry()
        .map(|d| d.as_secs() / 60)
        .unwrap_or_default();
    Some(format!("valid until {} ({} min left)", local, minutes))
}
