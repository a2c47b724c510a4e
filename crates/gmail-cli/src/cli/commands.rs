use clap::Subcommand;

/// Main CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Authorize access to Gmail, reusing the stored credential when possible
    Auth {
        /// Run the browser authorization even if a stored credential works
        #[arg(long)]
        force: bool,
    },

    /// Show the stored credential without contacting the provider
    Status,

    /// Delete the stored credential
    Logout,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Auth { force: false }
    }
}
