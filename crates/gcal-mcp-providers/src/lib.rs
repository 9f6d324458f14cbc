//! Calendar backends for gcal-mcp.
//!
//! - [`CalendarBackend`]: the remote actions the dispatcher can invoke
//! - [`ProviderError`]: backend failures with status and message
//! - [`google`]: the Google Calendar implementation

pub mod backend;
pub mod error;
#[cfg(feature = "google")]
pub mod google;

pub use backend::{BoxFuture, CalendarBackend};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
