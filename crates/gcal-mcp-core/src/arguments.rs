//! Typed tool arguments.
//!
//! Once a payload has passed schema validation it is converted into
//! [`ValidatedArguments`]. Event bodies stay as JSON mappings so every field
//! the caller supplied reaches the backend untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::Operation;

/// Sort order for event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventOrder {
    /// Order by start time (requires expanded recurring events).
    StartTime,
    /// Order by last modification time.
    Updated,
}

impl EventOrder {
    /// The value sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartTime => "startTime",
            Self::Updated => "updated",
        }
    }
}

/// Who receives notifications about a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SendUpdates {
    /// Notify all guests.
    #[default]
    All,
    /// Notify non-Google-Calendar guests only.
    ExternalOnly,
    /// Notify nobody.
    None,
}

impl SendUpdates {
    /// The value sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ExternalOnly => "externalOnly",
            Self::None => "none",
        }
    }
}

/// Arguments for `get-events`. Unset fields are left to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsArgs {
    pub calendar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_max: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_events: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<EventOrder>,
}

impl ListEventsArgs {
    /// Lists events of `calendar_id` with every optional filter unset.
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min: None,
            time_max: None,
            max_results: None,
            single_events: None,
            order_by: None,
        }
    }
}

/// A free/busy request body, forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreeBusyArgs {
    pub body: Map<String, Value>,
}

/// An event resource as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventBody(Map<String, Value>);

impl EventBody {
    /// Wraps a JSON mapping.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The raw fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the body, returning the raw fields.
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// `start.dateTime`, if set.
    pub fn start_date_time(&self) -> Option<&str> {
        self.date_time("start")
    }

    /// `end.dateTime`, if set.
    pub fn end_date_time(&self) -> Option<&str> {
        self.date_time("end")
    }

    fn date_time(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.get("dateTime")?.as_str()
    }

    /// The `[start, end)` window, when both bounds are set.
    pub fn window(&self) -> Option<EventWindow> {
        Some(EventWindow {
            start: self.start_date_time()?.to_string(),
            end: self.end_date_time()?.to_string(),
        })
    }

    /// True if the body requests or carries conference data.
    pub fn has_conference_data(&self) -> bool {
        self.0.contains_key("conferenceData")
    }

    /// True if the body carries attachments.
    pub fn has_attachments(&self) -> bool {
        self.0.contains_key("attachments")
    }
}

/// A half-open time window taken from an event's start and end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    pub start: String,
    pub end: String,
}

impl EventWindow {
    /// Builds the free/busy query covering this window on one calendar.
    pub fn free_busy_query(&self, calendar_id: &str) -> FreeBusyArgs {
        let mut item = Map::new();
        item.insert("id".to_string(), Value::from(calendar_id));

        let mut body = Map::new();
        body.insert("timeMin".to_string(), Value::from(self.start.as_str()));
        body.insert("timeMax".to_string(), Value::from(self.end.as_str()));
        body.insert("items".to_string(), Value::Array(vec![Value::Object(item)]));
        FreeBusyArgs { body }
    }
}

/// Arguments for `create-event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventArgs {
    pub calendar_id: String,
    pub event: EventBody,
}

/// Arguments for `update-event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventArgs {
    pub calendar_id: String,
    pub event_id: String,
    #[serde(default)]
    pub event: EventBody,
    #[serde(default)]
    pub send_updates: SendUpdates,
}

/// Arguments for `delete-event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventArgs {
    pub calendar_id: String,
    pub event_id: String,
    #[serde(default)]
    pub send_updates: SendUpdates,
}

/// Arguments for one call, typed by operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedArguments {
    GetEvents(ListEventsArgs),
    ListCalendars,
    CheckAvailability(FreeBusyArgs),
    CreateEvent(CreateEventArgs),
    UpdateEvent(UpdateEventArgs),
    DeleteEvent(DeleteEventArgs),
}

impl ValidatedArguments {
    /// Converts a schema-valid argument object into typed arguments.
    ///
    /// `None` is treated as an empty object.
    pub fn from_value(
        operation: Operation,
        arguments: Option<Value>,
    ) -> Result<Self, serde_json::Error> {
        let value = arguments.unwrap_or_else(|| Value::Object(Map::new()));
        Ok(match operation {
            Operation::GetEvents => Self::GetEvents(serde_json::from_value(value)?),
            Operation::ListCalendars => Self::ListCalendars,
            Operation::CheckAvailability => {
                Self::CheckAvailability(serde_json::from_value(value)?)
            }
            Operation::CreateEvent => Self::CreateEvent(serde_json::from_value(value)?),
            Operation::UpdateEvent => Self::UpdateEvent(serde_json::from_value(value)?),
            Operation::DeleteEvent => Self::DeleteEvent(serde_json::from_value(value)?),
        })
    }

    /// The operation these arguments belong to.
    pub fn operation(&self) -> Operation {
        match self {
            Self::GetEvents(_) => Operation::GetEvents,
            Self::ListCalendars => Operation::ListCalendars,
            Self::CheckAvailability(_) => Operation::CheckAvailability,
            Self::CreateEvent(_) => Operation::CreateEvent,
            Self::UpdateEvent(_) => Operation::UpdateEvent,
            Self::DeleteEvent(_) => Operation::DeleteEvent,
        }
    }
}
