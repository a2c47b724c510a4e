//! Defaults for the Gmail installed-application authorization flow
//!
//! Every value here can be overridden through configuration; these are
//! only the fallbacks compiled into the binary.

/// Read-only Gmail scope requested when no scopes are configured
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Port the local callback listener binds to
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// How long to wait for the browser redirect before giving up
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 5 * 60;

/// Grace period for in-flight callback connections on listener shutdown
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Client secrets file downloaded from the Google Cloud console
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Persisted credential written after a successful authorization
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Refresh the access token this long before its recorded expiry
pub const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;
