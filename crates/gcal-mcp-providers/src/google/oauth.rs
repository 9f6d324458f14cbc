//! OAuth 2.0 authorization code flow with PKCE for installed apps.
//!
//! 1. Generate a code verifier, its S256 challenge and a random state.
//! 2. Bind a loopback listener on `127.0.0.1`.
//! 3. Open the consent page in the browser (the URL is also printed to
//!    stderr).
//! 4. Accept the redirect, check `state`, take `code`.
//! 5. Exchange the code and verifier for access and refresh tokens.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Verifier length in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the browser redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Token endpoint client.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            credentials,
            http_client,
            token_url: GoogleConfig::DEFAULT_TOKEN_URL.to_string(),
        })
    }

    /// Points the client at a different token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Runs the interactive flow and returns fresh tokens.
    ///
    /// # Errors
    ///
    /// Fails if no loopback port is free, the user denies consent, the
    /// redirect does not arrive within five minutes, or the exchange fails.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        // stdout may be the protocol channel; prompts go to stderr.
        eprintln!("\nAuthorize gcal-mcp by opening this URL in your browser:\n\n{}\n", auth_url);
        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(&listener))
            .await
            .map_err(|_| ProviderError::authentication("timed out waiting for the OAuth redirect"))??;

        if callback.state.as_deref() != Some(pkce.state.as_str()) {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, discarding authorization code",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<TokenResponse> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_form(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok(response)
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.post_token_form(&params, "token exchange").await?;
        info!("obtained tokens");

        let granted = response
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_else(|| scopes.to_vec());

        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            granted,
        ))
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", what, e)).with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed: {}",
                what,
                token_error_message(&body)
            ))
            .with_status(status.as_u16()));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }
}

/// Google's token endpoint reports `{"error": "...", "error_description": "..."}`.
fn token_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct TokenError {
        error: String,
        error_description: Option<String>,
    }

    match serde_json::from_str::<TokenError>(body) {
        Ok(TokenError {
            error,
            error_description: Some(description),
        }) => format!("{}: {}", error, description),
        Ok(TokenError { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    }
}

async fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
            debug!("bound loopback server on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Parameters carried by the OAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Callback {
    pub code: String,
    pub state: Option<String>,
}

/// Accepts connections until one carries the redirect.
async fn wait_for_callback(listener: &TcpListener) -> ProviderResult<Callback> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| ProviderError::internal(format!("failed to accept connection: {}", e)))?;
        debug!(%peer, "loopback connection");
        if let Some(result) = handle_connection(stream).await {
            return result;
        }
    }
}

async fn handle_connection(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        reader.read_line(&mut request_line).await.ok()?;
    }

    let result = parse_request_line(&request_line);
    let response: &[u8] = match &result {
        None => b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        Some(Ok(_)) => {
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization successful</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        }
        Some(Err(_)) => {
            b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization failed</h1>\
            <p>You can close this window.</p></body></html>"
        }
    };
    let _ = stream.write_all(response).await;
    let _ = stream.shutdown().await;
    result
}

/// Interprets `GET /callback?code=...&state=... HTTP/1.1`.
///
/// Returns `None` for requests that are not the redirect (favicon etc.).
pub(crate) fn parse_request_line(line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let url = Url::parse("http://127.0.0.1").ok()?.join(target).ok()?;
    if url.path() != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        ))));
    }

    Some(match code {
        Some(code) => Ok(Callback { code, state }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE verifier, challenge and state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent page URL. Asks for offline access so a refresh
    /// token is returned.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::mock_http::MockServer;

    #[test]
    fn pkce_verifier_length() {
        // 32 bytes -> 43 base64url characters without padding
        assert_eq!(PkceFlow::new().verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        let challenge = PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_values_are_random() {
        let a = PkceFlow::new();
        let b = PkceFlow::new();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn auth_url_format() {
        let flow = PkceFlow::new();
        let url = flow.build_auth_url(
            "test-client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &["https://www.googleapis.com/auth/calendar".to_string()],
        );

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar&"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains(&format!("state={}", flow.state)));
    }

    #[test]
    fn callback_with_code_and_state() {
        let parsed = parse_request_line("GET /callback?code=4%2F0Ab&state=xyz&scope=a HTTP/1.1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            Callback {
                code: "4/0Ab".to_string(),
                state: Some("xyz".to_string())
            }
        );
    }

    #[test]
    fn callback_error_and_missing_code() {
        let err = parse_request_line("GET /callback?error=access_denied HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert!(err.message().contains("access_denied"));

        assert!(parse_request_line("GET /callback HTTP/1.1").unwrap().is_err());
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert!(parse_request_line("GET /favicon.ico HTTP/1.1").is_none());
        assert!(parse_request_line("POST /callback?code=x HTTP/1.1").is_none());
        assert!(parse_request_line("").is_none());
    }

    #[test]
    fn token_error_messages() {
        assert_eq!(
            token_error_message(r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#),
            "invalid_grant: Token has been expired or revoked."
        );
        assert_eq!(token_error_message(r#"{"error": "invalid_client"}"#), "invalid_client");
        assert_eq!(token_error_message(" oops \n"), "oops");
    }

    #[tokio::test]
    async fn refresh_posts_form_and_parses_response() {
        let server = MockServer::start(vec![(
            200,
            r#"{"access_token": "new-token", "expires_in": 3599, "token_type": "Bearer"}"#.into(),
        )])
        .await;

        let client = OAuthClient::new(
            OAuthCredentials::new("id.apps.googleusercontent.com", "secret"),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_token_url(server.url("token"));

        let response = client.refresh_token("refresh-1").await.unwrap();
        assert_eq!(response.access_token, "new-token");
        assert_eq!(response.expires_in, Some(3599));
        assert!(response.refresh_token.is_none());

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].body.contains("grant_type=refresh_token"));
        assert!(requests[0].body.contains("refresh_token=refresh-1"));
    }

    #[tokio::test]
    async fn refresh_failure_is_authentication_error() {
        let server = MockServer::start(vec![(
            400,
            r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#.into(),
        )])
        .await;

        let client = OAuthClient::new(
            OAuthCredentials::new("id.apps.googleusercontent.com", "secret"),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_token_url(server.url("token"));

        let err = client.refresh_token("revoked").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.status(), Some(400));
        assert!(err.message().contains("invalid_grant: Bad Request"));
    }
}
