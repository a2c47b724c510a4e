//! Opening the authorization URL in the user's browser

use console::style;
use std::io;
use tracing::{debug, info};

/// Something that can show the authorization URL to the user
pub trait UrlOpener: Send + Sync {
    /// Try to open `url`. Failures are non-fatal for the flow.
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the platform's default browser
#[derive(Debug, Clone)]
pub struct SystemBrowser {
    enabled: bool,
}

impl SystemBrowser {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for SystemBrowser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        if !self.enabled {
            debug!("Automatic browser launch disabled");
            return Ok(());
        }
        open_url(url)
    }
}

/// Open `url` with the platform's default browser
pub fn open_url(url: &str) -> io::Result<()> {
    info!("Opening browser for authorization");
    webbrowser::open(url)
}

/// Print the URL to stderr so it can be copied when no browser opens
pub fn print_authorization_url(url: &str) {
    eprintln!(
        "{} Browser didn't open? Visit this URL to authorize:",
        style("ℹ").blue()
    );
    eprintln!("{}", style(url).dim());
}
