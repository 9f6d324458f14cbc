//! The calendar backend capability.
//!
//! [`CalendarBackend`] is the seam between the dispatcher and the remote
//! calendar service. Each method maps to one remote action and returns the
//! backend's JSON response untouched, or a [`ProviderError`] carrying the
//! backend's status and message.

use std::future::Future;
use std::pin::Pin;

use gcal_mcp_core::{CreateEventArgs, DeleteEventArgs, FreeBusyArgs, ListEventsArgs, UpdateEventArgs};
use serde_json::Value;

use crate::error::ProviderResult;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote calendar actions.
///
/// Implementations must be `Send + Sync`; the dispatcher shares one instance
/// across concurrent calls.
///
/// ```ignore
/// impl CalendarBackend for MyBackend {
///     fn name(&self) -> &str { "mine" }
///
///     fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Value>> {
///         Box::pin(async move { Ok(json!({"items": []})) })
///     }
///     // ... other methods
/// }
/// ```
pub trait CalendarBackend: Send + Sync {
    /// Returns the backend name (e.g. "google").
    fn name(&self) -> &str;

    /// Lists events of one calendar.
    fn list_events(&self, args: ListEventsArgs) -> BoxFuture<'_, ProviderResult<Value>>;

    /// Lists the calendars of the authorized user.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Value>>;

    /// Queries free/busy information with a caller-built request body.
    fn query_free_busy(&self, args: FreeBusyArgs) -> BoxFuture<'_, ProviderResult<Value>>;

    /// Inserts a new event.
    fn insert_event(&self, args: CreateEventArgs) -> BoxFuture<'_, ProviderResult<Value>>;

    /// Patches an existing event with the supplied fields.
    fn patch_event(&self, args: UpdateEventArgs) -> BoxFuture<'_, ProviderResult<Value>>;

    /// Deletes an event.
    fn delete_event(&self, args: DeleteEventArgs) -> BoxFuture<'_, ProviderResult<Value>>;
}
