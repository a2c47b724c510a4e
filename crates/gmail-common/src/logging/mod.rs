//! Unified logging initialization for the gmail-cli-tools binaries
//!
//! Filter priority:
//! 1. CLI flags (`-v/-q`)
//! 2. `RUST_LOG`
//! 3. Binary-specific default

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified verbosity level and default filter.
///
/// Logs go to stderr so that stdout stays free for command output.
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{Verbosity, InfoLevel};
/// use gmail_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[clap(flatten)]
///     verbosity: Verbosity<InfoLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "gmail_auth=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = resolve_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Build the effective filter without installing a subscriber.
pub fn resolve_filter<L: LogLevel>(
    verbosity: &Verbosity<L>,
    default_filter: &str,
) -> Result<EnvFilter> {
    let filter = if verbosity.is_present() {
        match verbosity.log_level() {
            Some(level) => EnvFilter::try_new(level.to_string().to_lowercase())?,
            None => EnvFilter::try_new("off")?,
        }
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?
    };

    Ok(filter)
}
