//! Token endpoint client
//!
//! Thin wrapper around the `oauth2` crate for the three provider calls the
//! flow needs: building the authorization URL, exchanging the code and
//! refreshing the access token.

use super::state_token::StateToken;
use super::types::{AuthError, AuthResult, ClientConfig, Credential};
use oauth2::{
    basic::{BasicClient, BasicTokenResponse},
    reqwest::async_http_client,
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use tracing::{debug, info};
use url::Url;

/// OAuth client bound to one provider registration
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: ClientConfig,
}

impl OAuthClient {
    /// Create a client, validating the configured endpoints up front
    pub fn new(config: ClientConfig) -> AuthResult<Self> {
        let client = Self { config };
        client.basic_client(None)?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn basic_client(&self, redirect_uri: Option<&str>) -> AuthResult<BasicClient> {
        let client = BasicClient::new(
            ClientId::new(self.config.client_id.clone()),
            Some(ClientSecret::new(self.config.client_secret.clone())),
            AuthUrl::new(self.config.auth_endpoint.clone())
                .map_err(|e| AuthError::ConfigError(format!("Invalid auth endpoint: {}", e)))?,
            Some(
                TokenUrl::new(self.config.token_endpoint.clone()).map_err(|e| {
                    AuthError::ConfigError(format!("Invalid token endpoint: {}", e))
                })?,
            ),
        );

        match redirect_uri {
            Some(uri) => Ok(client.set_redirect_uri(
                RedirectUrl::new(uri.to_string())
                    .map_err(|e| AuthError::ConfigError(format!("Invalid redirect URI: {}", e)))?,
            )),
            None => Ok(client),
        }
    }

    /// Build the authorization URL for one attempt.
    ///
    /// Requests offline access so the provider issues a refresh token, and
    /// forces the consent prompt so a new refresh token is issued even when
    /// the user authorized this client before.
    pub fn authorize_url(&self, redirect_uri: &str, state: &StateToken) -> AuthResult<Url> {
        debug!("Building authorization URL");

        let client = self.basic_client(Some(redirect_uri))?;
        let state_value = state.as_str().to_string();
        let mut request = client.authorize_url(move || CsrfToken::new(state_value));

        for scope in &self.config.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, _csrf_token) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        Ok(url)
    }

    /// Exchange authorization code for a credential
    pub async fn exchange_code(&self, redirect_uri: &str, code: &str) -> AuthResult<Credential> {
        debug!("Exchanging authorization code for tokens");

        let client = self.basic_client(Some(redirect_uri))?;
        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::ExchangeError(describe_token_error(&e)))?;

        info!("Token exchange completed successfully");
        Ok(credential_from_response(&response, None))
    }

    /// Refresh the access token using the credential's refresh token
    pub async fn refresh(&self, credential: &Credential) -> AuthResult<Credential> {
        debug!("Refreshing access token");

        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::RefreshError("credential has no refresh token".into()))?;

        let client = self.basic_client(None)?;
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::RefreshError(describe_token_error(&e)))?;

        info!("Token refresh completed successfully");
        Ok(credential_from_response(&response, Some(refresh_token)))
    }
}

/// Convert a token response, keeping the previous refresh token when the
/// provider does not rotate it
fn credential_from_response(
    response: &BasicTokenResponse,
    previous_refresh_token: Option<&str>,
) -> Credential {
    let refresh_token = response
        .refresh_token()
        .map(|rt| rt.secret().to_string())
        .or_else(|| previous_refresh_token.map(str::to_string));

    Credential::new(
        response.access_token().secret().to_string(),
        refresh_token,
        response.expires_in(),
    )
}

fn describe_token_error<RE>(
    error: &oauth2::RequestTokenError<RE, oauth2::basic::BasicErrorResponse>,
) -> String
where
    RE: std::error::Error + 'static,
{
    match error {
        oauth2::RequestTokenError::ServerResponse(response) => {
            let mut message = response.error().to_string();
            if let Some(description) = response.error_description() {
                message.push_str(": ");
                message.push_str(description);
            }
            message
        }
        oauth2::RequestTokenError::Request(e) => format!("request failed: {}", e),
        oauth2::RequestTokenError::Parse(e, _) => format!("unexpected token response: {}", e),
        oauth2::RequestTokenError::Other(e) => e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            client_id: "client-123.apps.googleusercontent.com".into(),
            client_secret: "shh".into(),
            auth_endpoint: "https://accounts.google.com/o/oauth2/auth".into(),
            token_endpoint: "https://oauth2.googleapis.com/token".into(),
            scopes: vec!["https://www.googleapis.com/auth/gmail.readonly".into()],
        }
    }

    #[test]
    fn test_authorize_url_carries_state_and_offline_access() {
        let client = OAuthClient::new(config()).unwrap();
        let state = StateToken::generate().unwrap();
        let url = client
            .authorize_url("http://localhost:8080", &state)
            .unwrap();

        let params: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(params.get("state").map(String::as_str), Some(state.as_str()));
        assert_eq!(params.get("access_type").map(String::as_str), Some("offline"));
        assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(
            params.get("redirect_uri").map(String::as_str),
            Some("http://localhost:8080")
        );
        assert_eq!(
            params.get("scope").map(String::as_str),
            Some("https://www.googleapis.com/auth/gmail.readonly")
        );
        assert_eq!(
            params.get("client_id").map(String::as_str),
            Some("client-123.apps.googleusercontent.com")
        );
    }

    #[test]
    fn test_invalid_endpoint_is_a_config_error() {
        let mut bad = config();
        bad.token_endpoint = "not a url".into();
        assert!(matches!(
            OAuthClient::new(bad),
            Err(AuthError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails() {
        let client = OAuthClient::new(config()).unwrap();
        let credential = Credential::new("access".into(), None, None);
        assert!(matches!(
            client.refresh(&credential).await,
            Err(AuthError::RefreshError(_))
        ));
    }
}
