//! Authentication commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gcal_mcp_providers::google::{AuthMode, GoogleBackend, GoogleConfig, OAuthCredentials};
use tracing::{info, warn};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Run the Google authorization flow.
///
/// Resolves credentials from CLI flags, a `--credentials-file`, or
/// `config.toml`, then runs the OAuth 2.0 PKCE flow unless cached tokens
/// are still usable.
///
/// Credentials given on the command line are persisted to `config_path` so
/// `gcal-mcp run` can find them.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let (credentials, source) = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.google.as_ref(),
    )?;
    credentials
        .validate()
        .map_err(|e| ClientError::config(format!("invalid Google credentials: {}", e)))?;

    let mut google_config = GoogleConfig::new(credentials);
    if let Some(ref settings) = config.google {
        if let Some(ref path) = settings.token_path {
            google_config = google_config.with_token_path(path);
        }
        if let Some(secs) = settings.timeout_secs {
            google_config = google_config.with_timeout(Duration::from_secs(secs));
        }
    }

    let backend = GoogleBackend::new(google_config)?;

    if !force && backend.authorize(AuthMode::CachedOnly).await.is_ok() {
        persist(config_path, &source);
        println!("Already authorized with Google Calendar.");
        println!("Use --force to authorize again.");
        return Ok(());
    }

    println!("Starting Google Calendar authorization...");
    println!();
    println!("A browser window will open for you to grant access.");
    println!("If the browser doesn't open, copy the URL printed above.");
    println!();

    backend.login().await?;
    persist(config_path, &source);

    info!("Google authorization successful");
    println!();
    println!("Authorization successful!");
    println!("Tokens saved to {}", backend.token_path().display());
    println!();
    println!("Next: gcal-mcp init");
    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, PartialEq)]
enum CredentialSource {
    /// `--client-id` and `--client-secret`.
    Inline { client_id: String, client_secret: String },
    /// `--credentials-file`.
    File(PathBuf),
    /// Already in config.toml.
    Config,
}

fn persist(config_path: &Path, source: &CredentialSource) {
    match save_credentials_to_config(config_path, source) {
        Ok(true) => println!("Credentials saved to {}", config_path.display()),
        Ok(false) => {}
        Err(e) => warn!("could not save credentials: {}", e),
    }
}

/// Saves credentials under `[google]` in the config file.
///
/// Comments and unrelated settings are kept. Returns `false` without
/// touching the file when the credentials already came from it.
fn save_credentials_to_config(config_path: &Path, source: &CredentialSource) -> ClientResult<bool> {
    if *source == CredentialSource::Config {
        return Ok(false);
    }

    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::config(format!(
            "could not parse {} for writing: {}",
            config_path.display(),
            e
        ))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::config(format!("'google' in {} is not a table", config_path.display()))
    })?;

    // Inline values win over the file, so only one form is kept.
    match source {
        CredentialSource::Inline {
            client_id,
            client_secret,
        } => {
            google["client_id"] = toml_edit::value(client_id.as_str());
            google["client_secret"] = toml_edit::value(client_secret.as_str());
            google.remove("credentials_file");
        }
        CredentialSource::File(path) => {
            let absolute = std::path::absolute(path)?;
            google["credentials_file"] = toml_edit::value(absolute.to_string_lossy().as_ref());
            google.remove("client_id");
            google.remove("client_secret");
        }
        CredentialSource::Config => {}
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;
    info!("Credentials saved to {}", config_path.display());
    Ok(true)
}

/// Resolves Google credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` section
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    match (cli_client_id, cli_client_secret) {
        (Some(id), Some(secret)) => {
            let source = CredentialSource::Inline {
                client_id: id.clone(),
                client_secret: secret.clone(),
            };
            return Ok((OAuthCredentials::new(id, secret), source));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(ClientError::config(
                "both --client-id and --client-secret are required when providing credentials directly",
            ));
        }
        (None, None) => {}
    }

    if let Some(path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(&path).map_err(|e| {
            ClientError::config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds, CredentialSource::File(path)));
    }

    if let Some(google) = config_google {
        let creds = google.resolve_credentials()?;
        return Ok((creds, CredentialSource::Config));
    }

    Err(ClientError::config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}
