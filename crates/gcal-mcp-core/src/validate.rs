//! Argument validation against [`Schema`]s.
//!
//! Validation walks the entire value and reports every violation it finds,
//! not only the first one. A call either satisfies its schema completely or
//! is rejected with the full list.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::{ObjectSchema, Schema, SchemaKind};

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Dot-separated path to the offending field (`event.attendees.0.email`).
    /// Empty for the argument object itself.
    pub path: String,
    /// What is wrong with the field.
    pub message: String,
}

impl Violation {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "arguments: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validates an argument object against its schema.
///
/// `None` is treated as an empty argument object.
pub fn validate_arguments(
    schema: &ObjectSchema,
    arguments: Option<&Value>,
) -> Result<(), Vec<Violation>> {
    let empty = Value::Object(Map::new());
    let mut violations = Vec::new();

    match arguments.unwrap_or(&empty) {
        Value::Object(fields) => check_object(schema, fields, "", &mut violations),
        other => violations.push(Violation::new(
            "",
            format!("expected object, got {}", json_type(other)),
        )),
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check(schema: &Schema, value: &Value, path: &str, violations: &mut Vec<Violation>) {
    match (&schema.kind, value) {
        (SchemaKind::String { allowed }, Value::String(s)) => {
            if !allowed.is_empty() && !allowed.iter().any(|a| a == s) {
                let expected = allowed
                    .iter()
                    .map(|a| format!("'{a}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                violations.push(Violation::new(
                    path,
                    format!("expected one of {expected}, got '{s}'"),
                ));
            }
        }
        (SchemaKind::Number, Value::Number(_)) => {}
        (SchemaKind::Integer { minimum, maximum }, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            let actual = n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from));
            if let (Some(min), Some(actual)) = (minimum, actual)
                && actual < i128::from(*min)
            {
                violations.push(Violation::new(path, format!("must be >= {min}")));
            }
            if let (Some(max), Some(actual)) = (maximum, actual)
                && actual > i128::from(*max)
            {
                violations.push(Violation::new(path, format!("must be <= {max}")));
            }
        }
        (SchemaKind::Boolean, Value::Bool(_)) => {}
        (SchemaKind::Array { items, max_items }, Value::Array(elements)) => {
            if let Some(max) = max_items
                && elements.len() > *max
            {
                violations.push(Violation::new(
                    path,
                    format!(
                        "must contain at most {max} items, got {}",
                        elements.len()
                    ),
                ));
            }
            for (index, element) in elements.iter().enumerate() {
                check(items, element, &child_path(path, &index.to_string()), violations);
            }
        }
        (SchemaKind::Object(object), Value::Object(fields)) => {
            check_object(object, fields, path, violations);
        }
        (_, other) => violations.push(Violation::new(
            path,
            format!("expected {}, got {}", schema.type_name(), json_type(other)),
        )),
    }
}

fn check_object(
    schema: &ObjectSchema,
    fields: &Map<String, Value>,
    path: &str,
    violations: &mut Vec<Violation>,
) {
    for (name, field_schema) in schema.properties() {
        let field_path = child_path(path, name);
        match fields.get(name) {
            Some(value) => check(field_schema, value, &field_path, violations),
            None if schema.required().iter().any(|r| r == name) => {
                violations.push(Violation::new(&field_path, "required field is missing"));
            }
            None => {}
        }
    }

    if schema.is_closed() {
        for name in fields.keys() {
            if schema.get(name).is_none() {
                violations.push(Violation::new(&child_path(path, name), "unknown field"));
            }
        }
    }
}

fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_schema() -> ObjectSchema {
        let time = ObjectSchema::new()
            .required_property("dateTime", Schema::string())
            .property("timeZone", Schema::string());
        let attendee = ObjectSchema::new()
            .required_property("email", Schema::string())
            .property(
                "responseStatus",
                Schema::one_of(["needsAction", "declined", "tentative", "accepted"]),
            )
            .property("additionalGuests", Schema::integer().with_minimum(0));

        ObjectSchema::new()
            .required_property("calendarId", Schema::string())
            .required_property(
                "event",
                Schema::object(
                    ObjectSchema::new()
                        .required_property("summary", Schema::string())
                        .required_property("start", Schema::object(time.clone()))
                        .required_property("end", Schema::object(time))
                        .property("attendees", Schema::array(Schema::object(attendee)))
                        .property(
                            "attachments",
                            Schema::array(Schema::object(
                                ObjectSchema::new().required_property("fileId", Schema::string()),
                            ))
                            .with_max_items(2),
                        )
                        .closed(),
                ),
            )
            .closed()
    }

    fn paths(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn valid_payload_passes() {
        let args = json!({
            "calendarId": "primary",
            "event": {
                "summary": "Sync",
                "start": {"dateTime": "2024-12-14T09:00:00-07:00"},
                "end": {"dateTime": "2024-12-14T10:00:00-07:00", "timeZone": "America/Denver"},
                "attendees": [{"email": "a@example.com", "additionalGuests": 0}]
            }
        });
        assert!(validate_arguments(&event_schema(), Some(&args)).is_ok());
    }

    #[test]
    fn missing_arguments_checked_as_empty_object() {
        let violations = validate_arguments(&event_schema(), None).unwrap_err();
        assert_eq!(paths(&violations), ["calendarId", "event"]);
        assert!(violations.iter().all(|v| v.message == "required field is missing"));
    }

    #[test]
    fn non_object_arguments_rejected_at_root() {
        let violations = validate_arguments(&event_schema(), Some(&json!([1, 2]))).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "");
        assert_eq!(violations[0].message, "expected object, got array");
        assert_eq!(violations[0].to_string(), "arguments: expected object, got array");
    }

    #[test]
    fn reports_every_violation() {
        let args = json!({
            "calendarId": 42,
            "event": {
                "start": {},
                "end": {"dateTime": "2024-12-14T10:00:00Z"},
                "attendees": [
                    {"email": "a@example.com", "responseStatus": "maybe"},
                    {"additionalGuests": -1}
                ]
            }
        });

        let violations = validate_arguments(&event_schema(), Some(&args)).unwrap_err();
        assert_eq!(
            paths(&violations),
            [
                "calendarId",
                "event.summary",
                "event.start.dateTime",
                "event.attendees.0.responseStatus",
                "event.attendees.1.email",
                "event.attendees.1.additionalGuests",
            ]
        );
        assert_eq!(violations[0].message, "expected string, got integer");
        assert_eq!(
            violations[3].message,
            "expected one of 'needsAction', 'declined', 'tentative', 'accepted', got 'maybe'"
        );
        assert_eq!(violations[5].message, "must be >= 0");
    }

    #[test]
    fn array_over_limit_still_checks_items() {
        let args = json!({
            "calendarId": "primary",
            "event": {
                "summary": "Sync",
                "start": {"dateTime": "2024-12-14T09:00:00Z"},
                "end": {"dateTime": "2024-12-14T10:00:00Z"},
                "attachments": [{"fileId": "a"}, {"fileId": "b"}, {"title": "c"}]
            }
        });

        let violations = validate_arguments(&event_schema(), Some(&args)).unwrap_err();
        assert_eq!(paths(&violations), ["event.attachments", "event.attachments.2.fileId"]);
        assert_eq!(violations[0].message, "must contain at most 2 items, got 3");
    }

    #[test]
    fn closed_objects_reject_unknown_fields() {
        let args = json!({
            "calendarId": "primary",
            "color": "red",
            "event": {
                "summary": "Sync",
                "start": {"dateTime": "2024-12-14T09:00:00Z", "extra": true},
                "end": {"dateTime": "2024-12-14T10:00:00Z"},
                "guestsCanModify": true
            }
        });

        let violations = validate_arguments(&event_schema(), Some(&args)).unwrap_err();
        assert_eq!(paths(&violations), ["event.guestsCanModify", "color"]);
        assert!(violations.iter().all(|v| v.message == "unknown field"));
    }

    #[test]
    fn null_is_a_type_violation() {
        let schema = ObjectSchema::new().property("timeMin", Schema::string());
        let violations =
            validate_arguments(&schema, Some(&json!({"timeMin": null}))).unwrap_err();
        assert_eq!(violations[0].message, "expected string, got null");
    }

    #[test]
    fn integer_bounds() {
        let schema = ObjectSchema::new()
            .property("low", Schema::integer().with_minimum(1))
            .property("high", Schema::integer().with_maximum(i64::from(u32::MAX)));
        let violations = validate_arguments(
            &schema,
            Some(&json!({"low": 0, "high": u64::MAX})),
        )
        .unwrap_err();
        assert_eq!(paths(&violations), ["low", "high"]);
        assert_eq!(violations[1].message, "must be <= 4294967295");

        assert!(validate_arguments(&schema, Some(&json!({"low": 1, "high": 4294967295u64}))).is_ok());
    }

    #[test]
    fn fractional_number_is_not_an_integer() {
        let schema = ObjectSchema::new()
            .property("count", Schema::integer())
            .property("ratio", Schema::number());
        let violations =
            validate_arguments(&schema, Some(&json!({"count": 1.5, "ratio": 1.5}))).unwrap_err();
        assert_eq!(paths(&violations), ["count"]);
        assert_eq!(violations[0].message, "expected integer, got number");
    }
}
