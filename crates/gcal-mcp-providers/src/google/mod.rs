//! Google Calendar backend.
//!
//! - OAuth 2.0 PKCE consent flow with a loopback redirect
//! - Token cache with automatic refresh
//! - Calendar API v3 calls returning raw JSON
//!
//! ```ignore
//! use gcal_mcp_providers::google::{AuthMode, GoogleBackend, GoogleConfig, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("credentials.json")?;
//! let backend = GoogleBackend::new(GoogleConfig::new(credentials))?;
//! backend.authorize(AuthMode::Interactive).await?;
//! let calendars = backend.list_calendars().await?;
//! ```

mod backend;
mod client;
mod config;
#[cfg(test)]
mod mock_http;
mod oauth;
mod tokens;

pub use backend::{AuthMode, GoogleBackend};
pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, TokenResponse};
pub use tokens::{TokenInfo, TokenStorage};
