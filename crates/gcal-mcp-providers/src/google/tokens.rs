//! Cached OAuth tokens.
//!
//! Tokens live in a JSON file next to the user's data, written atomically
//! with owner-only permissions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Seconds shaved off the reported lifetime so refresh happens early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted with this token.
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a token set from a token endpoint response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// True if the access token is expired or about to expire. Tokens
    /// without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh. Google may rotate the
    /// refresh token too.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// File-backed token storage with an in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads tokens from disk.
    ///
    /// Returns `Ok(false)` when no token file exists.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {}", e))
        })?;

        info!("loaded tokens from {:?}", self.path);
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::configuration(format!("failed to restrict token file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    /// Returns a copy of the current tokens.
    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the tokens and persists them.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.save(&tokens)?;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(())
    }

    /// Applies a refresh response and persists the result.
    pub fn apply_refresh(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) -> ProviderResult<TokenInfo> {
        let mut tokens = self.get().ok_or_else(|| ProviderError::internal("no tokens to update"))?;
        tokens.apply_refresh(access_token, expires_in_secs, refresh_token);
        self.set(tokens.clone())?;
        Ok(tokens)
    }

    /// Removes the tokens from memory and disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
            })?;
            info!("cleared tokens from {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when no tokens are loaded or they lack a required scope.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        self.get()
            .is_none_or(|tokens| !tokens.has_scopes(required_scopes))
    }
}
