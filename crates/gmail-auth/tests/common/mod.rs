//! Shared fixtures for the gmail-auth integration tests

#![allow(dead_code)]

use gmail_auth::auth::UrlOpener;
use gmail_auth::{ClientConfig, FlowSettings};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// What the simulated user does after the authorization URL is opened
#[derive(Debug, Clone)]
pub enum BrowserAction {
    /// Approve and get redirected with `code` and the issued state
    Approve { code: String },
    /// Approve, but the redirect carries a different state
    ApproveWithState { code: String, state: String },
    /// Approve with the issued state altered in its last character
    ApproveTampered { code: String },
    /// Hit the redirect URI without any parameters
    NoCode,
    /// Deny consent
    Deny,
    /// Never come back
    Ignore,
}

/// Stand-in for the user's browser: reads the authorization URL and performs
/// the redirect against the local callback listener.
pub struct SimulatedBrowser {
    action: BrowserAction,
    opened: AtomicUsize,
    last_url: Mutex<Option<Url>>,
}

impl SimulatedBrowser {
    pub fn new(action: BrowserAction) -> Self {
        Self {
            action,
            opened: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn approving(code: &str) -> Self {
        Self::new(BrowserAction::Approve {
            code: code.to_string(),
        })
    }

    pub fn times_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<Url> {
        self.last_url.lock().unwrap().clone()
    }

    /// Port of the redirect URI from the last opened authorization URL
    pub fn redirect_port(&self) -> Option<u16> {
        let url = self.last_url()?;
        let params = query(&url);
        Url::parse(params.get("redirect_uri")?).ok()?.port()
    }
}

impl UrlOpener for SimulatedBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let auth_url =
            Url::parse(url).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        *self.last_url.lock().unwrap() = Some(auth_url.clone());

        let params = query(&auth_url);
        let state = params.get("state").cloned().unwrap_or_default();
        let mut redirect = Url::parse(&params["redirect_uri"])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        match &self.action {
            BrowserAction::Approve { code } => {
                redirect
                    .query_pairs_mut()
                    .append_pair("code", code)
                    .append_pair("state", &state);
            }
            BrowserAction::ApproveWithState { code, state } => {
                redirect
                    .query_pairs_mut()
                    .append_pair("code", code)
                    .append_pair("state", state);
            }
            BrowserAction::ApproveTampered { code } => {
                let mut tampered = state.clone();
                let last = if tampered.pop() == Some('A') { 'B' } else { 'A' };
                tampered.push(last);
                redirect
                    .query_pairs_mut()
                    .append_pair("code", code)
                    .append_pair("state", &tampered);
            }
            BrowserAction::NoCode => {}
            BrowserAction::Deny => {
                redirect
                    .query_pairs_mut()
                    .append_pair("error", "access_denied")
                    .append_pair("state", &state);
            }
            BrowserAction::Ignore => return Ok(()),
        }

        tokio::spawn(async move {
            let client = reqwest::Client::builder().no_proxy().build().unwrap();
            let _ = client.get(redirect).send().await;
        });
        Ok(())
    }
}

fn query(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

pub fn client_config(token_server: &MockServer) -> ClientConfig {
    ClientConfig {
        client_id: "test-client.apps.googleusercontent.com".to_string(),
        client_secret: "test-secret".to_string(),
        auth_endpoint: "https://accounts.example.com/o/oauth2/auth".to_string(),
        token_endpoint: format!("{}/token", token_server.uri()),
        scopes: vec![gmail_common::GMAIL_READONLY_SCOPE.to_string()],
    }
}

/// Ephemeral port, short timeout
pub fn flow_settings(timeout: Duration) -> FlowSettings {
    FlowSettings {
        callback_port: 0,
        callback_timeout: timeout,
        shutdown_grace: Duration::from_millis(500),
    }
}

pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> ResponseTemplate {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3599,
        "scope": gmail_common::GMAIL_READONLY_SCOPE,
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

/// Token endpoint answering the authorization code grant for `code`
pub async fn mount_code_exchange(
    server: &MockServer,
    code: &str,
    access_token: &str,
    refresh_token: &str,
    expected_calls: u64,
) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(token_response(access_token, Some(refresh_token)))
        .expect(expected_calls)
        .mount(server)
        .await;
}
