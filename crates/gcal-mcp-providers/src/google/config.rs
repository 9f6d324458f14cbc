//! Google backend configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of a downloaded `credentials.json`.
///
/// Desktop clients carry an `installed` section, web clients a `web`
/// section. Some tools write the two fields at the root instead.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from the JSON text of a credentials file.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "credentials file has no 'installed' or 'web' section and no root client_id/client_secret",
            )),
        }
    }

    /// Checks that both fields look like Google OAuth client credentials.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar backend.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,
    /// Where OAuth tokens are cached.
    pub token_path: PathBuf,
    /// Calendar API v3 root, overridable for tests and proxies.
    pub api_base_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// Ports tried, in order, for the OAuth loopback redirect.
    pub loopback_port_range: (u16, u16),
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Full read/write access to calendars and events.
    pub const CALENDAR_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3/";

    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            api_base_url: Self::DEFAULT_API_BASE.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("gcal-mcp/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::CALENDAR_SCOPE.to_string()],
        }
    }

    /// `<data dir>/gcal-mcp/google-tokens.json`.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal-mcp")
            .join("google-tokens.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Parses the API root. A trailing slash is added so relative joins keep
    /// the last path segment.
    pub fn api_base(&self) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.api_base_url).map_err(|e| {
            ProviderError::configuration(format!(
                "invalid API base URL '{}': {}",
                self.api_base_url, e
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(ProviderError::configuration(format!(
                "invalid API base URL '{}'",
                self.api_base_url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        self.api_base().map_err(|e| e.message().to_string())?;

        Ok(())
    }
}
