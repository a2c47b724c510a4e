//! Shared building blocks for the gmail-cli-tools binaries.

pub mod auth_constants;
pub mod logging;

pub use auth_constants::*;
