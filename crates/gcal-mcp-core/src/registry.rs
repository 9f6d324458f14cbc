//! The operation registry.
//!
//! A [`Registry`] is built once at startup and is read-only afterwards. It
//! owns one [`OperationDescriptor`] per advertised tool, in declaration order.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::schema::ObjectSchema;

/// The backend actions a tool can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List events in a calendar.
    GetEvents,
    /// List the calendars of the authorized user.
    ListCalendars,
    /// Query free/busy information.
    CheckAvailability,
    /// Insert a new event.
    CreateEvent,
    /// Patch an existing event.
    UpdateEvent,
    /// Delete an event.
    DeleteEvent,
}

impl Operation {
    /// Every operation, in catalog order.
    pub const ALL: [Operation; 6] = [
        Self::GetEvents,
        Self::ListCalendars,
        Self::CheckAvailability,
        Self::CreateEvent,
        Self::UpdateEvent,
        Self::DeleteEvent,
    ];

    /// Returns the tool name callers use for this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetEvents => "get-events",
            Self::ListCalendars => "list-calendars",
            Self::CheckAvailability => "check-availability",
            Self::CreateEvent => "create-event",
            Self::UpdateEvent => "update-event",
            Self::DeleteEvent => "delete-event",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no known operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperationName(pub String);

impl FromStr for Operation {
    type Err = UnknownOperationName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| UnknownOperationName(s.to_string()))
    }
}

/// Static metadata for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    operation: Operation,
    description: String,
    schema: ObjectSchema,
}

impl OperationDescriptor {
    /// Creates a descriptor.
    pub fn new(operation: Operation, description: impl Into<String>, schema: ObjectSchema) -> Self {
        Self {
            operation,
            description: description.into(),
            schema,
        }
    }

    /// The tool name.
    pub fn name(&self) -> &'static str {
        self.operation.name()
    }

    /// The operation this tool routes to.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The argument schema.
    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    /// The argument schema rendered as JSON Schema.
    pub fn input_schema(&self) -> Value {
        self.schema.to_json_schema()
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two descriptors share a name.
    #[error("duplicate operation name: {0}")]
    DuplicateName(String),
}

/// Immutable catalog of tools.
#[derive(Debug, Clone)]
pub struct Registry {
    descriptors: Vec<OperationDescriptor>,
}

impl Registry {
    /// Builds a registry from descriptors, keeping their order.
    pub fn new(descriptors: Vec<OperationDescriptor>) -> Result<Self, RegistryError> {
        for (index, descriptor) in descriptors.iter().enumerate() {
            if descriptors[..index]
                .iter()
                .any(|earlier| earlier.name() == descriptor.name())
            {
                return Err(RegistryError::DuplicateName(descriptor.name().to_string()));
            }
        }
        Ok(Self { descriptors })
    }

    /// All descriptors in declaration order.
    pub fn list(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    /// Finds a descriptor by exact, case-sensitive name.
    pub fn find(&self, name: &str) -> Option<&OperationDescriptor> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
