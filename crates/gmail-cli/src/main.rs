//! Main entry point for the gmail-auth CLI

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use gmail_cli::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Disable location display (file paths and line numbers)
    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    gmail_common::logging::init_logging(&args.verbosity, "gmail_auth=info,gmail_cli=info")
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(args.run().await?)
}
