//! Validated tool dispatch.
//!
//! A call goes through `Received -> Resolved -> Validated`, then either
//! `ConflictChecked -> Dispatched` or `ShortCircuited`, and ends in
//! `Completed` or `Failed`. Each stage is recorded on the `dispatch` span.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcal_mcp_core::{
    AvailabilityResult, EventWindow, Registry, ValidatedArguments, Violation, validate_arguments,
};
use gcal_mcp_providers::{CalendarBackend, ProviderError, ProviderResult};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{Span, debug, info, warn};

use crate::config::{DEFAULT_BACKEND_TIMEOUT, ServerConfig};

/// Status string carried by conflict payloads.
pub const CONFLICT_STATUS: &str = "CONFLICT";

/// One tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub operation_name: String,
    /// Raw arguments. `None` is treated as an empty object.
    pub arguments: Option<Value>,
}

impl ToolCallRequest {
    pub fn new(operation_name: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            operation_name: operation_name.into(),
            arguments,
        }
    }
}

/// Returned instead of creating or moving an event into a busy window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictPayload {
    pub error: String,
    pub status: String,
    /// Busy intervals reported for the requested window.
    pub busy: Vec<Value>,
}

impl ConflictPayload {
    fn new(calendar_id: &str, window: &EventWindow, busy: Vec<Value>) -> Self {
        Self {
            error: format!(
                "The requested time {} to {} overlaps existing events on calendar '{}'. Choose another time.",
                window.start, window.end, calendar_id
            ),
            status: CONFLICT_STATUS.to_string(),
            busy,
        }
    }
}

/// A successful dispatch outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallResult {
    /// The backend's response, untouched.
    Success(Value),
    /// The availability precheck found the window busy.
    Conflict(ConflictPayload),
}

impl ToolCallResult {
    /// The JSON handed back to the caller.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Success(value) => Ok(value.clone()),
            Self::Conflict(conflict) => serde_json::to_value(conflict),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Why a call did not produce a result.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No tool with that name.
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    /// The arguments failed schema validation.
    #[error("Invalid arguments: {}", join_violations(.0))]
    InvalidArguments(Vec<Violation>),

    /// The backend call failed or timed out.
    #[error(transparent)]
    Backend(#[from] ProviderError),

    /// Unexpected fault inside the server.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-call progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Received,
    Resolved,
    Validated,
    ConflictChecked,
    Dispatched,
    ShortCircuited,
    Completed,
    Failed,
}

impl DispatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Resolved => "resolved",
            Self::Validated => "validated",
            Self::ConflictChecked => "conflict_checked",
            Self::Dispatched => "dispatched",
            Self::ShortCircuited => "short_circuited",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: DispatchStage) {
    Span::current().record("stage", stage.as_str());
    debug!(%stage, "Dispatch stage");
}

/// Dispatcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Query free/busy before create-event and update-event.
    pub enable_availability_precheck: bool,
    /// Bound on each backend call.
    pub backend_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enable_availability_precheck: true,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }
}

impl From<&ServerConfig> for DispatcherConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            enable_availability_precheck: config.availability_precheck,
            backend_timeout: config.backend_timeout,
        }
    }
}

/// Routes validated calls to the calendar backend.
///
/// Holds only shared read-only handles, so clones are cheap and calls may
/// run concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    backend: Arc<dyn CalendarBackend>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        backend: Arc<dyn CalendarBackend>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            config,
        }
    }

    /// The tool catalog.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Runs one call to completion.
    #[tracing::instrument(
        name = "dispatch",
        skip(self, request),
        fields(operation = %request.operation_name, stage, duration_ms)
    )]
    pub async fn dispatch(
        &self,
        request: ToolCallRequest,
    ) -> Result<ToolCallResult, DispatchError> {
        let start = Instant::now();
        enter(DispatchStage::Received);

        let outcome = self.run(request).await;
        let duration_ms = start.elapsed().as_millis();
        Span::current().record("duration_ms", duration_ms);

        match &outcome {
            Ok(ToolCallResult::Success(_)) => {
                enter(DispatchStage::Completed);
                info!(duration_ms, "Tool call completed");
            }
            Ok(ToolCallResult::Conflict(conflict)) => {
                info!(
                    duration_ms,
                    busy = conflict.busy.len(),
                    "Tool call short-circuited by availability conflict"
                );
            }
            Err(e) => {
                enter(DispatchStage::Failed);
                warn!(duration_ms, error = %e, "Tool call failed");
            }
        }
        outcome
    }

    async fn run(&self, request: ToolCallRequest) -> Result<ToolCallResult, DispatchError> {
        let descriptor = self
            .registry
            .find(&request.operation_name)
            .ok_or_else(|| DispatchError::UnknownOperation(request.operation_name.clone()))?;
        enter(DispatchStage::Resolved);

        validate_arguments(descriptor.schema(), request.arguments.as_ref())
            .map_err(DispatchError::InvalidArguments)?;
        // Anything the schema accepts but the typed form rejects is still the
        // caller's mistake.
        let arguments = ValidatedArguments::from_value(descriptor.operation(), request.arguments)
            .map_err(|e| {
                DispatchError::InvalidArguments(vec![Violation {
                    path: String::new(),
                    message: e.to_string(),
                }])
            })?;
        enter(DispatchStage::Validated);

        if let Some(conflict) = self.precheck(&arguments).await? {
            enter(DispatchStage::ShortCircuited);
            return Ok(ToolCallResult::Conflict(conflict));
        }

        enter(DispatchStage::Dispatched);
        let payload = self.invoke(arguments).await?;
        Ok(ToolCallResult::Success(payload))
    }

    /// Checks the target window of create-event, and of update-event when
    /// both bounds are supplied.
    async fn precheck(
        &self,
        arguments: &ValidatedArguments,
    ) -> Result<Option<ConflictPayload>, DispatchError> {
        if !self.config.enable_availability_precheck {
            return Ok(None);
        }

        let (calendar_id, window) = match arguments {
            ValidatedArguments::CreateEvent(args) => (&args.calendar_id, args.event.window()),
            ValidatedArguments::UpdateEvent(args) => (&args.calendar_id, args.event.window()),
            _ => return Ok(None),
        };
        let Some(window) = window else {
            return Ok(None);
        };

        debug!(calendar_id = %calendar_id, start = %window.start, end = %window.end, "Checking availability");
        let response = self
            .call(
                "freebusy.query",
                self.backend.query_free_busy(window.free_busy_query(calendar_id)),
            )
            .await?;

        let availability = AvailabilityResult::from_free_busy(&response, calendar_id);
        if availability.available {
            enter(DispatchStage::ConflictChecked);
            Ok(None)
        } else {
            Ok(Some(ConflictPayload::new(calendar_id, &window, availability.busy)))
        }
    }

    async fn invoke(&self, arguments: ValidatedArguments) -> Result<Value, DispatchError> {
        let (action, future) = match arguments {
            ValidatedArguments::GetEvents(args) => ("events.list", self.backend.list_events(args)),
            ValidatedArguments::ListCalendars => {
                ("calendarList.list", self.backend.list_calendars())
            }
            ValidatedArguments::CheckAvailability(args) => {
                ("freebusy.query", self.backend.query_free_busy(args))
            }
            ValidatedArguments::CreateEvent(args) => {
                ("events.insert", self.backend.insert_event(args))
            }
            ValidatedArguments::UpdateEvent(args) => {
                ("events.patch", self.backend.patch_event(args))
            }
            ValidatedArguments::DeleteEvent(args) => {
                ("events.delete", self.backend.delete_event(args))
            }
        };
        self.call(action, future).await
    }

    /// Awaits one backend call under the configured timeout.
    async fn call<F>(&self, action: &'static str, future: F) -> Result<Value, DispatchError>
    where
        F: Future<Output = ProviderResult<Value>>,
    {
        let timeout = self.config.backend_timeout;
        match tokio::time::timeout(timeout, future).await {
            Ok(result) => {
                debug!(action, ok = result.is_ok(), "Backend call returned");
                result.map_err(DispatchError::Backend)
            }
            Err(_) => Err(DispatchError::Backend(
                ProviderError::timeout(format!("{action} did not complete within {timeout:?}"))
                    .with_provider(self.backend.name()),
            )),
        }
    }
}
