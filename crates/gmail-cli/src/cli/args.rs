use crate::cli::{commands::Commands, handlers};
use crate::config::{CliConfig, ConfigOverrides};
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

/// gmail-auth - authorize Gmail command-line tools
#[derive(Parser, Debug)]
#[command(
    name = "gmail-auth",
    version,
    about = "Authorize Gmail command-line tools with your Google account",
    long_about = "Authorize Gmail command-line tools with your Google account.

QUICK START:
  gmail-auth                        # Authorize (opens the browser when needed)
  gmail-auth status                 # Show the stored credential
  gmail-auth logout                 # Forget the stored credential

CONFIGURATION:
  gmail-auth.toml in the working directory, GMAIL_* environment
  variables (e.g. GMAIL_CREDENTIALS_FILE) and the flags below."
)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// OAuth client secrets file
    #[arg(long, global = true, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Stored credential file
    #[arg(long, global = true, value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// Local port for the authorization redirect
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Seconds to wait for the browser redirect
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the authorization URL instead of opening a browser
    #[arg(long, global = true)]
    pub no_browser: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Subcommand to execute (defaults to `auth`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Args {
    /// Flags that override file and environment configuration
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            credentials_file: self.credentials.clone(),
            token_file: self.token_file.clone(),
            callback_port: self.port,
            callback_timeout_secs: self.timeout,
            open_browser: self.no_browser.then_some(false),
        }
    }

    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let config = CliConfig::load(self.config.as_deref(), &self.overrides())?;

        match self.command.clone().unwrap_or_default() {
            Commands::Auth { force } => handlers::auth::handle_auth(&config, force).await,
            Commands::Status => handlers::auth::handle_status(&config).await,
            Commands::Logout => handlers::auth::handle_logout(&config).await,
        }
    }
}
