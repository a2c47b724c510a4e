//! Configuration management for the gmail-auth CLI
//!
//! Layers, lowest priority first:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `gmail-auth.toml` in the working directory)
//! 3. `GMAIL_*` environment variables
//! 4. Command-line flags

use crate::error::{CliError, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use gmail_auth::FlowSettings;
use gmail_common::{
    DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT_SECS, DEFAULT_CREDENTIALS_FILE,
    DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_TOKEN_FILE, GMAIL_READONLY_SCOPE,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "gmail-auth.toml";

/// Prefix for environment overrides, e.g. `GMAIL_CREDENTIALS_FILE`
pub const ENV_PREFIX: &str = "GMAIL_";

/// CLI configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// OAuth client secrets downloaded from the Google Cloud console
    pub credentials_file: PathBuf,

    /// Where the authorized credential is stored
    pub token_file: PathBuf,

    /// Local port for the authorization redirect
    pub callback_port: u16,

    /// Seconds to wait for the redirect before giving up
    pub callback_timeout_secs: u64,

    /// Seconds granted to in-flight requests when the listener stops
    pub shutdown_grace_secs: u64,

    /// Launch the system browser automatically
    pub open_browser: bool,

    /// Scopes requested during authorization
    pub scopes: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            callback_port: DEFAULT_CALLBACK_PORT,
            callback_timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            open_browser: true,
            scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
        }
    }
}

/// Values given on the command line; unset fields leave lower layers alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_browser: Option<bool>,
}

impl CliConfig {
    /// Load and validate the layered configuration.
    ///
    /// An explicit `config_path` must exist; the default file is optional.
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(CliConfig::default()));

        match config_path {
            Some(path) => {
                let path = expand_path(path);
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                debug!("Loading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    debug!("Loading configuration from {}", default_path.display());
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides));

        let mut config: CliConfig = figment.extract()?;
        config.credentials_file = expand_path(&config.credentials_file);
        config.token_file = expand_path(&config.token_file);
        config.validate()?;
        Ok(config)
    }

    /// Reject values the authorization flow cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.callback_port == 0 {
            return Err(CliError::Config(
                "callback_port must be a fixed port registered with the provider".to_string(),
            ));
        }
        if self.callback_timeout_secs == 0 {
            return Err(CliError::Config(
                "callback_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.scopes.iter().all(|s| s.trim().is_empty()) {
            return Err(CliError::Config(
                "at least one scope must be configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            callback_port: self.callback_port,
            callback_timeout: Duration::from_secs(self.callback_timeout_secs),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        }
    }
}

/// Expand `~` and environment variables in a configured path
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}
