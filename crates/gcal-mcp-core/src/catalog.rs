//! The Google Calendar tool catalog.

use crate::registry::{Operation, OperationDescriptor, Registry, RegistryError};
use crate::schema::{ObjectSchema, Schema};

/// Maximum number of attachments on one event.
pub const MAX_ATTACHMENTS: usize = 25;

/// Deployment-specific catalog settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Organization e-mail domain (e.g. `example.com`). When set, the
    /// check-availability description tells callers how to address
    /// colleagues.
    pub email_domain: Option<String>,
}

impl CatalogOptions {
    /// Sets the organization e-mail domain.
    pub fn with_email_domain(mut self, domain: impl Into<String>) -> Self {
        self.email_domain = Some(domain.into());
        self
    }
}

impl Registry {
    /// Builds the Google Calendar catalog.
    pub fn google_calendar(options: &CatalogOptions) -> Result<Self, RegistryError> {
        Self::new(descriptors(options))
    }
}

/// The six Google Calendar tools, in catalog order.
pub fn descriptors(options: &CatalogOptions) -> Vec<OperationDescriptor> {
    Operation::ALL
        .into_iter()
        .map(|operation| match operation {
            Operation::GetEvents => OperationDescriptor::new(
                operation,
                "Get events from calendar",
                get_events_schema(),
            ),
            Operation::ListCalendars => OperationDescriptor::new(
                operation,
                "List all calendars",
                ObjectSchema::new(),
            ),
            Operation::CheckAvailability => OperationDescriptor::new(
                operation,
                check_availability_description(options),
                check_availability_schema(),
            ),
            Operation::CreateEvent => OperationDescriptor::new(
                operation,
                "Create an event in Google Calendar",
                create_event_schema(),
            ),
            Operation::UpdateEvent => OperationDescriptor::new(
                operation,
                "Update an existing event in Google Calendar. Only the supplied event fields are changed.",
                update_event_schema(),
            ),
            Operation::DeleteEvent => OperationDescriptor::new(
                operation,
                "Delete an event from Google Calendar",
                delete_event_schema(),
            ),
        })
        .collect()
}

fn check_availability_description(options: &CatalogOptions) -> String {
    let base = "Check availability for yourself and/or others.";
    match options.email_domain.as_deref() {
        Some(domain) => format!(
            "{base} When checking for other people in the organization, their emails will always be their name and then @{}",
            domain.trim_start_matches('@')
        ),
        None => base.to_string(),
    }
}

fn send_updates() -> Schema {
    Schema::one_of(["all", "externalOnly", "none"])
        .with_description("Guests who should receive notifications about the change")
        .with_default("all")
}

fn get_events_schema() -> ObjectSchema {
    ObjectSchema::new()
        .required_property(
            "calendarId",
            Schema::string().with_description("The ID of the calendar to get events from"),
        )
        .property(
            "timeMin",
            Schema::string().with_description("The minimum time to get events from"),
        )
        .property(
            "timeMax",
            Schema::string().with_description("The maximum time to get events from"),
        )
        .property(
            "maxResults",
            Schema::integer()
                .with_minimum(1)
                .with_maximum(i64::from(u32::MAX))
                .with_description("The maximum number of events to return"),
        )
        .property(
            "singleEvents",
            Schema::boolean()
                .with_description("Whether to expand recurring events into instances"),
        )
        .property(
            "orderBy",
            Schema::one_of(["startTime", "updated"])
                .with_description("The order of the events returned in the result"),
        )
        .closed()
}

fn check_availability_schema() -> ObjectSchema {
    let item = ObjectSchema::new().property(
        "id",
        Schema::string().with_description("The identifier of a calendar or a group."),
    );

    ObjectSchema::new()
        .property(
            "calendarExpansionMax",
            Schema::number().with_description(
                "Maximal number of calendars for which FreeBusy information is to be provided. Optional. Maximum value is 50.",
            ),
        )
        .property(
            "groupExpansionMax",
            Schema::number().with_description(
                "Maximal number of calendar identifiers to be provided for a single group. Optional. An error is returned for a group with more members than this value. Maximum value is 100.",
            ),
        )
        .property(
            "items",
            Schema::array(Schema::object(item)).with_description(
                "List of calendars and/or groups to query for FreeBusy information. Optional.",
            ),
        )
        .property(
            "timeMax",
            Schema::string().with_description(
                "The end of the interval for the query formatted as per RFC3339.",
            ),
        )
        .property(
            "timeMin",
            Schema::string().with_description(
                "The start of the interval for the query formatted as per RFC3339.",
            ),
        )
        .property(
            "timeZone",
            Schema::string()
                .with_description("Time zone used in the response. Optional. The default is UTC."),
        )
}

fn event_time(which: &str, example: &str) -> Schema {
    Schema::object(
        ObjectSchema::new()
            .required_property(
                "dateTime",
                Schema::string().with_description(format!(
                    "The {which} time of the event formatted as per RFC3339 (e.g., '{example}')"
                )),
            )
            .property(
                "timeZone",
                Schema::string().with_description(format!(
                    "The time zone of the {which} time (e.g., 'America/Los_Angeles'). Defaults to calendar's time zone"
                )),
            ),
    )
    .with_description(format!("The {which} time of the event"))
}

fn attendee() -> Schema {
    Schema::object(
        ObjectSchema::new()
            .required_property(
                "email",
                Schema::string().with_description("The attendee's email address"),
            )
            .property(
                "displayName",
                Schema::string().with_description("The attendee's name, if available"),
            )
            .property(
                "optional",
                Schema::boolean()
                    .with_description("Whether this is an optional attendee")
                    .with_default(false),
            )
            .property(
                "responseStatus",
                Schema::one_of(["needsAction", "declined", "tentative", "accepted"])
                    .with_description("The attendee's response status")
                    .with_default("needsAction"),
            )
            .property(
                "comment",
                Schema::string().with_description("The attendee's response comment"),
            )
            .property(
                "additionalGuests",
                Schema::integer()
                    .with_minimum(0)
                    .with_description("Number of additional guests")
                    .with_default(0),
            ),
    )
}

fn attachment() -> Schema {
    Schema::object(
        ObjectSchema::new()
            .required_property(
                "fileId",
                Schema::string().with_description("ID of the Google Drive file"),
            )
            .property(
                "fileUrl",
                Schema::string().with_description("URL of the file in Google Drive"),
            )
            .property(
                "title",
                Schema::string().with_description("Title of the attachment"),
            )
            .property(
                "mimeType",
                Schema::string().with_description("MIME type of the attachment"),
            ),
    )
}

fn reminders() -> Schema {
    let reminder = ObjectSchema::new()
        .required_property(
            "method",
            Schema::one_of(["email", "popup"])
                .with_description("The method used by this reminder"),
        )
        .required_property(
            "minutes",
            Schema::integer()
                .with_description("Number of minutes before the event to trigger the reminder"),
        );

    Schema::object(
        ObjectSchema::new()
            .property(
                "useDefault",
                Schema::boolean()
                    .with_description("Whether to use the default reminders of the calendar")
                    .with_default(true),
            )
            .property(
                "overrides",
                Schema::array(Schema::object(reminder))
                    .with_description("Custom reminders for the event"),
            ),
    )
    .with_description("Reminders for the event")
}

fn conference_data() -> Schema {
    let solution_key = ObjectSchema::new().required_property(
        "type",
        Schema::string().with_description("Conference solution type (e.g., 'hangoutsMeet')"),
    );
    let create_request = ObjectSchema::new()
        .required_property(
            "requestId",
            Schema::string().with_description("Client-generated unique ID for this request"),
        )
        .property("conferenceSolutionKey", Schema::object(solution_key));

    Schema::object(ObjectSchema::new().property(
        "createRequest",
        Schema::object(create_request).with_description("Request to create a new conference"),
    ))
    .with_description("Conference-related information")
}

fn create_event_schema() -> ObjectSchema {
    let event = ObjectSchema::new()
        .required_property(
            "summary",
            Schema::string().with_description("Title of the event"),
        )
        .property(
            "description",
            Schema::string().with_description("Description of the event. Can contain HTML."),
        )
        .property(
            "location",
            Schema::string()
                .with_description("Geographic location of the event as free-form text"),
        )
        .property(
            "colorId",
            Schema::string().with_description(
                "The color of the event. Optional. See the Calendar UI for the list of available colors.",
            ),
        )
        .required_property("start", event_time("start", "2024-12-14T09:00:00-07:00"))
        .required_property("end", event_time("end", "2024-12-14T10:00:00-07:00"))
        .property(
            "recurrence",
            Schema::array(Schema::string().with_description(
                "Recurrence rule in iCalendar format (e.g., 'RRULE:FREQ=WEEKLY;COUNT=10;BYDAY=TU')",
            ))
            .with_description(
                "List of RRULE, EXRULE, RDATE and EXDATE lines for a recurring event",
            ),
        )
        .property(
            "attendees",
            Schema::array(attendee()).with_description("The attendees of the event"),
        )
        .property(
            "attachments",
            Schema::array(attachment())
                .with_max_items(MAX_ATTACHMENTS)
                .with_description("File attachments for the event (Google Drive files only)"),
        )
        .property("reminders", reminders())
        .property(
            "visibility",
            Schema::one_of(["default", "public", "private", "confidential"])
                .with_description("Visibility of the event")
                .with_default("default"),
        )
        .property(
            "transparency",
            Schema::one_of(["opaque", "transparent"])
                .with_description("Whether the event blocks time on the calendar")
                .with_default("opaque"),
        )
        .property("conferenceData", conference_data())
        .closed();

    ObjectSchema::new()
        .required_property(
            "calendarId",
            Schema::string().with_description(
                "The ID of the calendar to create the event in. Use 'primary' for the user's primary calendar.",
            ),
        )
        .required_property(
            "event",
            Schema::object(event).with_description("The event to create"),
        )
        .closed()
}

fn update_event_schema() -> ObjectSchema {
    ObjectSchema::new()
        .required_property(
            "calendarId",
            Schema::string().with_description("The ID of the calendar containing the event"),
        )
        .required_property(
            "eventId",
            Schema::string().with_description("The ID of the event to update"),
        )
        .property(
            "event",
            Schema::object(ObjectSchema::new()).with_description(
                "Event fields to change, in the same shape as create-event. Omitted fields are left untouched.",
            ),
        )
        .property("sendUpdates", send_updates())
}

fn delete_event_schema() -> ObjectSchema {
    ObjectSchema::new()
        .required_property(
            "calendarId",
            Schema::string().with_description("The ID of the calendar containing the event"),
        )
        .required_property(
            "eventId",
            Schema::string().with_description("The ID of the event to delete"),
        )
        .property("sendUpdates", send_updates())
}
