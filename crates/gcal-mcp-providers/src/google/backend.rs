//! [`CalendarBackend`] implementation for Google Calendar.

use std::path::Path;

use gcal_mcp_core::{CreateEventArgs, DeleteEventArgs, FreeBusyArgs, ListEventsArgs, UpdateEventArgs};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::backend::{BoxFuture, CalendarBackend};
use crate::error::{ProviderError, ProviderResult};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

/// Whether authorization may open a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Fall back to the browser consent flow when cached tokens are unusable.
    Interactive,
    /// Only use cached tokens, refreshing them if needed.
    CachedOnly,
}

/// Google Calendar backend.
pub struct GoogleBackend {
    config: GoogleConfig,
    base_url: Url,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: RwLock<Option<GoogleCalendarClient>>,
    /// Serializes refreshes so concurrent calls refresh once.
    refresh_lock: Mutex<()>,
}

impl GoogleBackend {
    /// Creates the backend and loads cached tokens. Does not authorize.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let base_url = config.api_base()?;
        let token_storage = TokenStorage::new(&config.token_path);
        if let Err(e) = token_storage.load() {
            warn!("ignoring unreadable token cache: {}", e);
        }

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?
            .with_token_url(&config.token_url);

        Ok(Self {
            config,
            base_url,
            token_storage,
            oauth_client,
            api_client: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Where tokens are cached.
    pub fn token_path(&self) -> &Path {
        self.token_storage.path()
    }

    /// Makes the backend ready to serve calls.
    ///
    /// Uses cached tokens when valid, refreshes them when expired, and
    /// otherwise runs the consent flow if `mode` allows it.
    ///
    /// # Errors
    ///
    /// Returns an authentication error when no usable tokens can be
    /// obtained.
    pub async fn authorize(&self, mode: AuthMode) -> ProviderResult<()> {
        if self.token_storage.needs_reauth(&self.config.scopes) {
            return match mode {
                AuthMode::Interactive => self.login().await,
                AuthMode::CachedOnly => Err(ProviderError::authentication(
                    "not authorized, run 'gcal-mcp auth google'",
                )),
            };
        }

        match self.ensure_client().await {
            Ok(()) => Ok(()),
            Err(e) if mode == AuthMode::Interactive => {
                warn!("cached tokens unusable ({}), starting consent flow", e);
                self.login().await
            }
            Err(e) => Err(e),
        }
    }

    /// Runs the consent flow unconditionally and stores the new tokens.
    pub async fn login(&self) -> ProviderResult<()> {
        info!("starting Google authorization flow");
        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.token_storage.set(tokens.clone())?;
        self.install_client(&tokens).await?;
        info!("authorization successful, tokens saved to {:?}", self.token_path());
        Ok(())
    }

    /// Ensures a client with a non-expired access token exists.
    async fn ensure_client(&self) -> ProviderResult<()> {
        if self.api_client.read().await.is_some()
            && self
                .token_storage
                .get()
                .is_some_and(|tokens| !tokens.is_expired())
        {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;

        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not authorized, run 'gcal-mcp auth google'")
        })?;

        let tokens = if tokens.is_expired() {
            self.refresh(&tokens).await?
        } else {
            tokens
        };

        self.install_client(&tokens).await
    }

    async fn refresh(&self, tokens: &TokenInfo) -> ProviderResult<TokenInfo> {
        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::authentication("access token expired and no refresh token is stored")
        })?;

        debug!("refreshing expired access token");
        let response = self.oauth_client.refresh_token(refresh_token).await?;
        self.token_storage.apply_refresh(
            response.access_token,
            response.expires_in,
            response.refresh_token,
        )
    }

    async fn install_client(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => c.set_access_token(&tokens.access_token),
            None => {
                *client = Some(GoogleCalendarClient::new(
                    self.base_url.clone(),
                    &tokens.access_token,
                    self.config.timeout,
                    &self.config.user_agent,
                )?);
            }
        }
        Ok(())
    }
}

fn client_unavailable() -> ProviderError {
    ProviderError::internal("calendar client is not initialized").with_provider("google")
}

impl CalendarBackend for GoogleBackend {
    fn name(&self) -> &str {
        "google"
    }

    fn list_events(&self, args: ListEventsArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(async move {
            self.ensure_client().await?;
            let client = self.api_client.read().await;
            client
                .as_ref()
                .ok_or_else(client_unavailable)?
                .list_events(&args)
                .await
        })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(async move {
            self.ensure_client().await?;
            let client = self.api_client.read().await;
            client
                .as_ref()
                .ok_or_else(client_unavailable)?
                .list_calendars()
                .await
        })
    }

    fn query_free_busy(&self, args: FreeBusyArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(async move {
            self.ensure_client().await?;
            let client = self.api_client.read().await;
            client
                .as_ref()
                .ok_or_else(client_unavailable)?
                .query_free_busy(&args)
                .await
        })
    }

    fn insert_event(&self, args: CreateEventArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(async move {
            self.ensure_client().await?;
            let client = self.api_client.read().await;
            client
                .as_ref()
                .ok_or_else(client_unavailable)?
                .insert_event(&args)
                .await
        })
    }

    fn patch_event(&self, args: UpdateEventArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(async move {
            self.ensure_client().await?;
            let client = self.api_client.read().await;
            client
                .as_ref()
                .ok_or_else(client_unavailable)?
                .patch_event(&args)
                .await
        })
    }

    fn delete_event(&self, args: DeleteEventArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(async move {
            self.ensure_client().await?;
            let client = self.api_client.read().await;
            client
                .as_ref()
                .ok_or_else(client_unavailable)?
                .delete_event(&args)
                .await
        })
    }
}
