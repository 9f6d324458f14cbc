//! Core types: argument schemas, validation, the Google Calendar tool catalog.

pub mod arguments;
pub mod availability;
pub mod catalog;
pub mod registry;
pub mod schema;
pub mod tracing;
pub mod validate;

pub use arguments::{
    CreateEventArgs, DeleteEventArgs, EventBody, EventOrder, EventWindow, FreeBusyArgs,
    ListEventsArgs, SendUpdates, UpdateEventArgs, ValidatedArguments,
};
pub use availability::AvailabilityResult;
pub use catalog::{CatalogOptions, MAX_ATTACHMENTS};
pub use registry::{Operation, OperationDescriptor, Registry, RegistryError, UnknownOperationName};
pub use schema::{ObjectSchema, Schema, SchemaKind};
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use validate::{Violation, validate_arguments};
