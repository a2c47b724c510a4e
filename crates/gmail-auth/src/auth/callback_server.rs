//! Local HTTP callback server for the OAuth authorization code flow
//!
//! This module implements a short-lived local HTTP server that receives the
//! authorization redirect from the identity provider. Exactly one result is
//! handed to the waiting flow; later requests only get a "session complete"
//! page.
//!
//! The redirect URI names `localhost`, so the listener binds the IPv4
//! loopback and, when available, the IPv6 loopback on the same port.

use super::types::{AuthError, AuthResult, CallbackResult};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::future::IntoFuture;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Query parameters from the provider redirect
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Shared state for callback handling
struct CallbackState {
    sender: Mutex<Option<oneshot::Sender<CallbackResult>>>,
}

impl CallbackState {
    /// Hand the result to the flow. Returns `false` once a result was already
    /// delivered (or the flow stopped listening).
    fn deliver(&self, result: CallbackResult) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }
}

/// Local HTTP server for OAuth callbacks
pub struct CallbackServer {
    port: u16,
    shutdown_grace: Duration,
}

impl CallbackServer {
    /// Create a new callback server for the given port
    pub fn new(port: u16, shutdown_grace: Duration) -> Self {
        Self {
            port,
            shutdown_grace,
        }
    }

    /// Bind the port and start serving in the background.
    ///
    /// A bind failure on the IPv4 loopback is returned immediately and never
    /// retried. The IPv6 loopback is bound on the same port if possible.
    pub async fn start(self) -> AuthResult<RunningCallbackServer> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AuthError::ListenerBindError { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AuthError::ListenerBindError { addr, source })?;

        let v6_addr = SocketAddr::from((Ipv6Addr::LOCALHOST, local_addr.port()));
        let v6_listener = match TcpListener::bind(v6_addr).await {
            Ok(listener) => Some(listener),
            Err(e) => {
                debug!("IPv6 loopback unavailable on {}: {}", v6_addr, e);
                None
            }
        };

        let (result_tx, result_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();
        let shutdown = CancellationToken::new();

        let state = Arc::new(CallbackState {
            sender: Mutex::new(Some(result_tx)),
        });

        let app = Router::new()
            .route("/", get(handle_callback))
            .fallback(handle_not_found)
            .with_state(state);

        let v4_signal = shutdown.clone();
        let v6_signal = shutdown.clone();
        let dual_stack = v6_listener.is_some();
        let handle = tokio::spawn(async move {
            let v4 = axum::serve(listener, app.clone())
                .with_graceful_shutdown(async move { v4_signal.cancelled().await });
            let served = match v6_listener {
                Some(v6_listener) => {
                    let v6 = axum::serve(v6_listener, app)
                        .with_graceful_shutdown(async move { v6_signal.cancelled().await });
                    let (v4, v6) = tokio::join!(v4.into_future(), v6.into_future());
                    v4.and(v6)
                }
                None => v4.await,
            };
            if let Err(e) = served {
                let _ = error_tx.send(AuthError::ListenerError(e.to_string()));
            }
        });

        if dual_stack {
            info!(
                "OAuth callback server listening on http://{} and http://{}",
                local_addr, v6_addr
            );
        } else {
            info!("OAuth callback server listening on http://{}", local_addr);
        }

        Ok(RunningCallbackServer {
            local_addr,
            result_rx,
            error_rx,
            shutdown,
            handle: Some(handle),
            shutdown_grace: self.shutdown_grace,
        })
    }
}

/// A bound callback listener waiting for the redirect
pub struct RunningCallbackServer {
    local_addr: SocketAddr,
    result_rx: oneshot::Receiver<CallbackResult>,
    error_rx: oneshot::Receiver<AuthError>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
    shutdown_grace: Duration,
}

impl RunningCallbackServer {
    /// IPv4 loopback address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Redirect URI pointing at this listener
    pub fn redirect_uri(&self) -> String {
        super::types::FlowSettings::redirect_uri_for(self.local_addr.port())
    }

    /// Wait for the first meaningful redirect or a listener failure.
    ///
    /// Cancel safe, so it can race a timer in `tokio::select!`. Must not be
    /// polled again after it has returned.
    pub async fn wait_for_callback(&mut self) -> AuthResult<CallbackResult> {
        tokio::select! {
            result = &mut self.result_rx => result.map_err(|_| {
                AuthError::ListenerError("callback channel closed unexpectedly".to_string())
            }),
            error = &mut self.error_rx => Err(error.unwrap_or_else(|_| {
                AuthError::ListenerError("callback listener stopped unexpectedly".to_string())
            })),
        }
    }

    /// Stop accepting connections and wait at most the grace period for
    /// in-flight requests. The port is released when this returns.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        match tokio::time::timeout(self.shutdown_grace, &mut handle).await {
            Ok(_) => debug!("OAuth callback server stopped"),
            Err(_) => {
                warn!(
                    "OAuth callback server did not stop within {:?}, aborting",
                    self.shutdown_grace
                );
                handle.abort();
                let _ = handle.await;
            }
        }
    }
}

impl Drop for RunningCallbackServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Axum handler for the provider redirect
async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!("Unreadable callback query: {}", rejection);
            return (
                StatusCode::BAD_REQUEST,
                Html(render_page(
                    "Invalid Callback Request",
                    "The redirect parameters could not be read.",
                    Some("Return to the terminal; the authorization is still waiting."),
                )),
            )
                .into_response();
        }
    };

    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        warn!("Provider returned an authorization error: {}", error);
        let message = params
            .error_description
            .clone()
            .unwrap_or_else(|| error.clone());
        let delivered = state.deliver(CallbackResult::Denied {
            error,
            description: params.error_description,
        });
        if !delivered {
            return session_complete();
        }
        return (
            StatusCode::OK,
            Html(render_page(
                "Authorization Failed",
                "The provider reported an error during authorization.",
                Some(&message),
            )),
        )
            .into_response();
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        debug!("Callback request without an authorization code");
        return (
            StatusCode::BAD_REQUEST,
            Html(render_page(
                "Missing Authorization Code",
                "This request did not carry an authorization code.",
                Some("Return to the terminal; the authorization is still waiting."),
            )),
        )
            .into_response();
    };

    let delivered = state.deliver(CallbackResult::Code {
        code,
        state: params.state.unwrap_or_default(),
    });
    if !delivered {
        return session_complete();
    }

    (
        StatusCode::OK,
        Html(render_page(
            "Authorization Received",
            "You can now close this window and return to the terminal.",
            None,
        )),
    )
        .into_response()
}

async fn handle_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn session_complete() -> Response {
    (
        StatusCode::GONE,
        Html(render_page(
            "Session Complete",
            "This authorization session has already finished.",
            Some("You can close this window."),
        )),
    )
        .into_response()
}

/// Render the minimal confirmation page shown in the browser
fn render_page(title: &str, message: &str, detail: Option<&str>) -> String {
    let detail = detail
        .map(|d| format!("<p class=\"detail\">{}</p>", escape_html(d)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Gmail CLI Tools - {title}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 4rem auto; max-width: 36rem; text-align: center; }}
        .detail {{ font-family: monospace; word-break: break-word; opacity: 0.8; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p>{message}</p>
    {detail}
</body>
</html>
"#,
        title = escape_html(title),
        message = escape_html(message),
    )
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn start_server() -> RunningCallbackServer {
        CallbackServer::new(0, Duration::from_millis(200))
            .start()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_delivers_code_and_state() {
        let mut server = start_server().await;
        let url = format!("http://{}/?code=abc&state=xyz", server.local_addr());

        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("return to the terminal"));

        let result = server.wait_for_callback().await.unwrap();
        assert_eq!(
            result,
            CallbackResult::Code {
                code: "abc".into(),
                state: "xyz".into()
            }
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_code_is_rejected_and_listener_keeps_waiting() {
        let mut server = start_server().await;
        let base = format!("http://{}", server.local_addr());

        let response = reqwest::get(format!("{base}/?state=xyz")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let response = reqwest::get(format!("{base}/?code=&state=xyz")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let pending =
            tokio::time::timeout(Duration::from_millis(100), server.wait_for_callback()).await;
        assert!(pending.is_err(), "no result should be delivered without a code");

        let response = reqwest::get(format!("{base}/?code=late&state=xyz")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let result = server.wait_for_callback().await.unwrap();
        assert!(matches!(result, CallbackResult::Code { code, .. } if code == "late"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_query_renders_page_and_keeps_waiting() {
        let mut server = start_server().await;
        let base = format!("http://{}", server.local_addr());

        let response = reqwest::get(format!("{base}/?code=a&code=b&state=s"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let content_type = response.headers()[reqwest::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/html"), "{content_type}");
        assert!(response.text().await.unwrap().contains("Invalid Callback Request"));

        let pending =
            tokio::time::timeout(Duration::from_millis(100), server.wait_for_callback()).await;
        assert!(pending.is_err(), "a malformed query must not end the session");

        reqwest::get(format!("{base}/?code=good&state=s")).await.unwrap();
        let result = server.wait_for_callback().await.unwrap();
        assert!(matches!(result, CallbackResult::Code { code, .. } if code == "good"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_redirect_uri_reaches_listener() {
        let mut server = start_server().await;
        let redirect_uri = server.redirect_uri();
        assert!(redirect_uri.starts_with("http://localhost:"));

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let response = client
            .get(format!("{redirect_uri}/?code=abc&state=xyz"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let result = server.wait_for_callback().await.unwrap();
        assert!(matches!(result, CallbackResult::Code { code, .. } if code == "abc"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_callback_gets_session_complete() {
        let mut server = start_server().await;
        let base = format!("http://{}", server.local_addr());

        reqwest::get(format!("{base}/?code=first&state=s")).await.unwrap();
        let second = reqwest::get(format!("{base}/?code=second&state=s"))
            .await
            .unwrap();
        assert_eq!(second.status(), reqwest::StatusCode::GONE);
        assert!(second.text().await.unwrap().contains("already finished"));

        let result = server.wait_for_callback().await.unwrap();
        assert!(matches!(result, CallbackResult::Code { code, .. } if code == "first"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_provider_error_is_delivered() {
        let mut server = start_server().await;
        let url = format!(
            "http://{}/?error=access_denied&error_description=%3Cb%3Euser%3C%2Fb%3E",
            server.local_addr()
        );

        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert!(body.contains("&lt;b&gt;user&lt;/b&gt;"));

        let result = server.wait_for_callback().await.unwrap();
        assert_eq!(
            result,
            CallbackResult::Denied {
                error: "access_denied".into(),
                description: Some("<b>user</b>".into()),
            }
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let server = start_server().await;
        let port = server.local_addr().port();

        let result = CallbackServer::new(port, Duration::from_millis(200))
            .start()
            .await;
        assert!(matches!(result, Err(AuthError::ListenerBindError { .. })));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_port() {
        let server = start_server().await;
        let addr = server.local_addr();
        server.shutdown().await;

        let rebound = std::net::TcpListener::bind(addr);
        assert!(rebound.is_ok(), "port should be free after shutdown");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">&</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }
}
