//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/gcal-mcp/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store`, resolved via `pass show`
//! - `env::VAR_NAME`, resolved from the environment
//! - plain text, used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use gcal_mcp_core::CatalogOptions;
use gcal_mcp_providers::google::{GoogleConfig, OAuthCredentials};
use gcal_mcp_server::{DEFAULT_BACKEND_TIMEOUT, DEFAULT_MAX_IN_FLIGHT, ServerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for gcal-mcp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    pub google: Option<GoogleSettings>,

    /// MCP server settings.
    pub server: ServerSettings,

    /// Tool catalog settings.
    pub catalog: CatalogSettings,
}

/// MCP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Check free/busy before creating or moving events.
    pub availability_precheck: bool,

    /// Bound on each calendar API call, in seconds.
    pub backend_timeout_secs: u64,

    /// Maximum number of requests handled concurrently.
    pub max_in_flight: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            availability_precheck: true,
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT.as_secs(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Tool catalog settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Organization e-mail domain mentioned in the check-availability tool.
    pub email_domain: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it does
    /// not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal-mcp")
    }

    /// Server settings in the server crate's terms.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_availability_precheck(self.server.availability_precheck)
            .with_backend_timeout(Duration::from_secs(self.server.backend_timeout_secs))
            .with_max_in_flight(self.server.max_in_flight)
    }

    /// Catalog options for building the registry.
    pub fn catalog_options(&self) -> CatalogOptions {
        match self.catalog.email_domain {
            Some(ref domain) => CatalogOptions::default().with_email_domain(domain),
            None => CatalogOptions::default(),
        }
    }

    /// Checks every section without contacting Google.
    pub fn validate(&self) -> ClientResult<()> {
        self.server_config()
            .validate()
            .map_err(|e| ClientError::config(e.to_string()))?;

        if let Some(domain) = self.catalog.email_domain.as_deref() {
            let bare = domain.trim_start_matches('@');
            if bare.is_empty() || bare.contains('@') {
                return Err(ClientError::config(format!(
                    "catalog.email_domain must be a bare domain like 'example.com', got '{}'",
                    domain
                )));
            }
        }

        if let Some(ref google) = self.google {
            google.to_provider_config()?;
        }
        Ok(())
    }

    /// The Google settings, or an error telling the user how to add them.
    pub fn google_settings(&self) -> ClientResult<&GoogleSettings> {
        self.google.as_ref().ok_or_else(|| {
            ClientError::config(format!(
                "no [google] section in {}. Run: gcal-mcp auth google --credentials-file <path>",
                Self::default_path().display()
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Google Calendar settings.
///
/// Credentials are either stored inline (`client_id`, `client_secret`, both
/// supporting `pass::` and `env::` references) or read from a Google Cloud
/// Console JSON file (`credentials_file`). Inline values win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Path to a credentials JSON file downloaded from the Cloud Console.
    pub credentials_file: Option<PathBuf>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,

    /// HTTP timeout for Google requests, in seconds.
    pub timeout_secs: Option<u64>,
}

impl GoogleSettings {
    /// Converts to backend configuration, resolving credentials.
    pub fn to_provider_config(&self) -> ClientResult<GoogleConfig> {
        let credentials = self.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| ClientError::config(format!("invalid Google credentials: {}", e)))?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config.validate().map_err(ClientError::Config)?;
        Ok(config)
    }

    /// Resolves OAuth credentials.
    ///
    /// Inline `client_id` + `client_secret` (with secret references
    /// expanded) take priority over `credentials_file`.
    pub fn resolve_credentials(&self) -> ClientResult<OAuthCredentials> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(raw_id), Some(raw_secret)) => {
                let id = crate::secret::resolve(raw_id)
                    .map_err(|e| ClientError::config(format!("failed to resolve client_id: {}", e)))?;
                let secret = crate::secret::resolve(raw_secret).map_err(|e| {
                    ClientError::config(format!("failed to resolve client_secret: {}", e))
                })?;
                Ok(OAuthCredentials::new(id, secret))
            }
            (Some(_), None) => Err(ClientError::config(
                "client_secret is missing from [google] section in config.toml",
            )),
            (None, Some(_)) => Err(ClientError::config(
                "client_id is missing from [google] section in config.toml",
            )),
            (None, None) => match self.credentials_file {
                Some(ref path) => OAuthCredentials::from_file(path).map_err(|e| {
                    ClientError::config(format!(
                        "failed to load credentials from {}: {}",
                        path.display(),
                        e
                    ))
                }),
                None => Err(ClientError::config(format!(
                    "Google credentials not found. Add to {}:\n  \
                     [google]\n  \
                     client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                     client_secret = \"YOUR_SECRET\"\n\n  \
                     Or run: gcal-mcp auth google --credentials-file <path>",
                    ClientConfig::default_path().display()
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ClientConfig::parse("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.server.availability_precheck);
        assert_eq!(config.server.backend_timeout_secs, 30);
        assert_eq!(config.server.max_in_flight, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_and_catalog_sections() {
        let config = ClientConfig::parse(
            r#"
[server]
availability_precheck = false
backend_timeout_secs = 10

[catalog]
email_domain = "example.com"
"#,
        )
        .unwrap();

        let server = config.server_config();
        assert!(!server.availability_precheck);
        assert_eq!(server.backend_timeout, Duration::from_secs(10));
        assert_eq!(server.max_in_flight, 8);
        assert_eq!(
            config.catalog_options().email_domain.as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn invalid_limits_fail_validation() {
        let config = ClientConfig::parse("[server]\nmax_in_flight = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = ClientConfig::parse("[catalog]\nemail_domain = \"me@example.com\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unreadable_toml_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[server\n").unwrap();
        assert!(matches!(
            ClientConfig::load_from(&path),
            Err(ClientError::Config(_))
        ));
        assert!(ClientConfig::load_from(&tmp.path().join("missing.toml")).is_err());
    }

    #[test]
    fn resolve_credentials_plain_text() {
        let settings = GoogleSettings {
            client_id: Some("test-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("test-secret".to_string()),
            ..Default::default()
        };
        let creds = settings.resolve_credentials().unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn resolve_credentials_env_prefix() {
        unsafe {
            std::env::set_var("_GCAL_MCP_TEST_CLIENT_ID", "env-id.apps.googleusercontent.com");
            std::env::set_var("_GCAL_MCP_TEST_CLIENT_SECRET", "env-secret");
        }

        let config = ClientConfig::parse(
            r#"
[google]
client_id = "env::_GCAL_MCP_TEST_CLIENT_ID"
client_secret = "env::_GCAL_MCP_TEST_CLIENT_SECRET"
"#,
        )
        .unwrap();
        let creds = config.google_settings().unwrap().resolve_credentials().unwrap();
        assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "env-secret");

        unsafe {
            std::env::remove_var("_GCAL_MCP_TEST_CLIENT_ID");
            std::env::remove_var("_GCAL_MCP_TEST_CLIENT_SECRET");
        }
    }

    #[test]
    fn resolve_credentials_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "file-id.apps.googleusercontent.com", "client_secret": "file-secret"}}"#,
        )
        .unwrap();

        let settings = GoogleSettings {
            credentials_file: Some(path),
            ..Default::default()
        };
        let creds = settings.resolve_credentials().unwrap();
        assert_eq!(creds.client_id, "file-id.apps.googleusercontent.com");
    }

    #[test]
    fn resolve_credentials_partial_or_missing_errors() {
        let only_id = GoogleSettings {
            client_id: Some("id.apps.googleusercontent.com".to_string()),
            ..Default::default()
        };
        let err = only_id.resolve_credentials().unwrap_err().to_string();
        assert!(err.contains("client_secret"));

        let err = GoogleSettings::default()
            .resolve_credentials()
            .unwrap_err()
            .to_string();
        assert!(err.contains("credentials not found"));
    }

    #[test]
    fn to_provider_config_applies_overrides() {
        let settings = GoogleSettings {
            client_id: Some("test.apps.googleusercontent.com".to_string()),
            client_secret: Some("test-secret".to_string()),
            token_path: Some(PathBuf::from("/tmp/gcal-mcp-tokens.json")),
            timeout_secs: Some(12),
            ..Default::default()
        };
        let config = settings.to_provider_config().unwrap();
        assert_eq!(config.credentials.client_secret, "test-secret");
        assert_eq!(config.token_path, PathBuf::from("/tmp/gcal-mcp-tokens.json"));
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn missing_google_section_is_explained() {
        let err = ClientConfig::default().google_settings().unwrap_err();
        assert!(err.to_string().contains("gcal-mcp auth google"));
    }
}
