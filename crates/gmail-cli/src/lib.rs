//! # gmail-cli
//!
//! Command-line front end for the Gmail tools' authorization: runs the
//! browser based OAuth flow, reports the stored credential and removes it.
//!
//! ## Architecture
//!
//! - Clap-based argument parsing with derive macros
//! - Handler-based command processing
//! - Layered configuration (defaults, TOML file, `GMAIL_*` env, flags)

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod shutdown;

pub use cli::*;
pub use error::*;
