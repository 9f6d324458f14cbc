//! Availability derived from free/busy responses.

use serde_json::Value;
use tracing::warn;

/// Whether a calendar is free over a queried window.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityResult {
    /// True iff no busy interval was reported.
    pub available: bool,
    /// The busy intervals, as returned by the backend.
    pub busy: Vec<Value>,
}

impl AvailabilityResult {
    /// Reads the busy list reported for `calendar_id` from a free/busy
    /// response (`{"calendars": {"<id>": {"busy": [...]}}}`).
    ///
    /// A calendar missing from the response counts as available.
    pub fn from_free_busy(response: &Value, calendar_id: &str) -> Self {
        let Some(entry) = response
            .get("calendars")
            .and_then(|calendars| calendars.get(calendar_id))
        else {
            warn!(calendar_id, "free/busy response has no entry for calendar");
            return Self::free();
        };

        if let Some(errors) = entry.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            warn!(calendar_id, ?errors, "free/busy query reported calendar errors");
        }

        let busy = entry
            .get("busy")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Self {
            available: busy.is_empty(),
            busy,
        }
    }

    fn free() -> Self {
        Self {
            available: true,
            busy: Vec::new(),
        }
    }
}
