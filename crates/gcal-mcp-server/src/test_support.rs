//! A scripted calendar backend that records every call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gcal_mcp_core::{
    CatalogOptions, CreateEventArgs, DeleteEventArgs, FreeBusyArgs, ListEventsArgs, Registry,
    UpdateEventArgs,
};
use gcal_mcp_providers::{BoxFuture, CalendarBackend, ProviderError, ProviderResult};
use serde_json::{Value, json};

use crate::dispatcher::{Dispatcher, DispatcherConfig};

/// Remote actions, as seen by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Action {
    ListEvents,
    ListCalendars,
    FreeBusy,
    Insert,
    Patch,
    Delete,
}

/// A call with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordedCall {
    ListEvents(ListEventsArgs),
    ListCalendars,
    FreeBusy(FreeBusyArgs),
    Insert(CreateEventArgs),
    Patch(UpdateEventArgs),
    Delete(DeleteEventArgs),
}

impl RecordedCall {
    pub(crate) fn action(&self) -> Action {
        match self {
            Self::ListEvents(_) => Action::ListEvents,
            Self::ListCalendars => Action::ListCalendars,
            Self::FreeBusy(_) => Action::FreeBusy,
            Self::Insert(_) => Action::Insert,
            Self::Patch(_) => Action::Patch,
            Self::Delete(_) => Action::Delete,
        }
    }
}

/// What the backend answers for one action.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(Value),
    Fail { status: u16, message: String },
    Hang,
}

#[derive(Default)]
pub(crate) struct RecordingBackend {
    replies: Mutex<HashMap<Action, Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, action: Action, reply: Reply) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .insert(action, reply);
        self
    }

    pub(crate) fn reply_json(self, action: Action, value: Value) -> Self {
        self.reply(action, Reply::Json(value))
    }

    pub(crate) fn busy(self, calendar_id: &str, intervals: Value) -> Self {
        self.reply_json(
            Action::FreeBusy,
            json!({"calendars": {calendar_id: {"busy": intervals}}}),
        )
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn actions(&self) -> Vec<Action> {
        self.calls().iter().map(RecordedCall::action).collect()
    }

    fn answer(&self, call: RecordedCall) -> BoxFuture<'_, ProviderResult<Value>> {
        let action = call.action();
        self.calls.lock().expect("calls lock").push(call);
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .get(&action)
            .cloned()
            .unwrap_or_else(|| Reply::Json(default_reply(action)));

        Box::pin(async move {
            match reply {
                Reply::Json(value) => Ok(value),
                Reply::Fail { status, message } => {
                    Err(ProviderError::from_status(status, message).with_provider("recording"))
                }
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

fn default_reply(action: Action) -> Value {
    match action {
        Action::ListEvents => json!({"kind": "calendar#events", "items": []}),
        Action::ListCalendars => json!({"kind": "calendar#calendarList", "items": []}),
        Action::FreeBusy => json!({"kind": "calendar#freeBusy", "calendars": {}}),
        Action::Insert | Action::Patch => json!({"kind": "calendar#event", "id": "evt-1"}),
        Action::Delete => json!({}),
    }
}

impl CalendarBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn list_events(&self, args: ListEventsArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        self.answer(RecordedCall::ListEvents(args))
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Value>> {
        self.answer(RecordedCall::ListCalendars)
    }

    fn query_free_busy(&self, args: FreeBusyArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        self.answer(RecordedCall::FreeBusy(args))
    }

    fn insert_event(&self, args: CreateEventArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        self.answer(RecordedCall::Insert(args))
    }

    fn patch_event(&self, args: UpdateEventArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        self.answer(RecordedCall::Patch(args))
    }

    fn delete_event(&self, args: DeleteEventArgs) -> BoxFuture<'_, ProviderResult<Value>> {
        self.answer(RecordedCall::Delete(args))
    }
}

/// A dispatcher over the Google Calendar catalog and the given backend.
pub(crate) fn dispatcher_with(
    backend: RecordingBackend,
    config: DispatcherConfig,
) -> (Dispatcher, Arc<RecordingBackend>) {
    let registry =
        Arc::new(Registry::google_calendar(&CatalogOptions::default()).expect("catalog builds"));
    let backend = Arc::new(backend);
    let dispatcher = Dispatcher::new(registry, backend.clone(), config);
    (dispatcher, backend)
}

/// The create-event arguments used across tests.
pub(crate) fn sync_meeting() -> Value {
    json!({
        "calendarId": "primary",
        "event": {
            "summary": "Sync",
            "start": {"dateTime": "2024-12-14T09:00:00-07:00"},
            "end": {"dateTime": "2024-12-14T10:00:00-07:00"}
        }
    })
}
