//! Configuration layering tests

use figment::Jail;
use gmail_cli::config::{CliConfig, ConfigOverrides, DEFAULT_CONFIG_FILE};
use gmail_cli::CliError;
use std::path::{Path, PathBuf};

fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> figment::error::Result<CliConfig> {
    CliConfig::load(path, overrides).map_err(|e| e.to_string().into())
}

#[test]
fn test_defaults_without_file_or_env() {
    Jail::expect_with(|_jail| {
        let config = load(None, &ConfigOverrides::default())?;
        assert_eq!(config, CliConfig::default());
        Ok(())
    });
}

#[test]
fn test_default_file_then_env_then_flags() {
    Jail::expect_with(|jail| {
        jail.create_file(
            DEFAULT_CONFIG_FILE,
            r#"
                credentials_file = "file-credentials.json"
                token_file = "file-token.json"
                callback_port = 8181
                open_browser = false
            "#,
        )?;
        jail.set_env("GMAIL_TOKEN_FILE", "env-token.json");
        jail.set_env("GMAIL_CALLBACK_PORT", "8282");

        let config = load(None, &ConfigOverrides::default())?;
        assert_eq!(config.credentials_file, PathBuf::from("file-credentials.json"));
        assert_eq!(config.token_file, PathBuf::from("env-token.json"));
        assert_eq!(config.callback_port, 8282);
        assert!(!config.open_browser);

        let overrides = ConfigOverrides {
            callback_port: Some(8383),
            ..ConfigOverrides::default()
        };
        let config = load(None, &overrides)?;
        assert_eq!(config.callback_port, 8383);
        assert_eq!(config.token_file, PathBuf::from("env-token.json"));
        Ok(())
    });
}

#[test]
fn test_credentials_file_from_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("GMAIL_CREDENTIALS_FILE", "secrets/client.json");
        let config = load(None, &ConfigOverrides::default())?;
        assert_eq!(config.credentials_file, PathBuf::from("secrets/client.json"));
        Ok(())
    });
}

#[test]
fn test_explicit_config_file_must_exist() {
    Jail::expect_with(|jail| {
        let missing = jail.directory().join("missing.toml");
        let result = CliConfig::load(Some(&missing), &ConfigOverrides::default());
        assert!(matches!(result, Err(CliError::Config(_))));
        Ok(())
    });
}

#[test]
fn test_invalid_values_are_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "callback_timeout_secs = 0")?;
        let path = jail.directory().join("custom.toml");
        let result = CliConfig::load(Some(&path), &ConfigOverrides::default());
        assert!(matches!(result, Err(CliError::Config(_))));

        jail.set_env("GMAIL_CALLBACK_PORT", "not-a-port");
        let result = CliConfig::load(None, &ConfigOverrides::default());
        assert!(matches!(result, Err(CliError::Config(_))));
        Ok(())
    });
}

#[test]
fn test_flow_settings_follow_config() {
    Jail::expect_with(|jail| {
        jail.set_env("GMAIL_CALLBACK_TIMEOUT_SECS", "42");
        let config = load(None, &ConfigOverrides::default())?;
        let settings = config.flow_settings();
        assert_eq!(settings.callback_port, 8080);
        assert_eq!(settings.callback_timeout.as_secs(), 42);
        Ok(())
    });
}
