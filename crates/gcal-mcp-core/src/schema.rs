//! Structural argument schemas.
//!
//! A [`Schema`] describes the shape a tool argument must have: its JSON type,
//! allowed string values, array bounds and nested object fields. Schemas are
//! used for two things only: validating caller-supplied arguments (see
//! [`crate::validate`]) and rendering the JSON Schema advertised in the tool
//! catalog.

use serde_json::{Map, Value};

/// The structural kind of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// A string, optionally restricted to a fixed set of values.
    String { allowed: Vec<String> },
    /// Any JSON number.
    Number,
    /// A whole number, optionally bounded.
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    /// `true` or `false`.
    Boolean,
    /// A sequence whose elements all match `items`.
    Array {
        items: Box<Schema>,
        max_items: Option<usize>,
    },
    /// A mapping with declared fields.
    Object(ObjectSchema),
}

/// One node of an argument schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// The structural kind.
    pub kind: SchemaKind,
    /// Human-readable description, advertised but never enforced.
    pub description: Option<String>,
    /// Default value advertised to callers. Informational only.
    pub default: Option<Value>,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
            default: None,
        }
    }

    /// A free string.
    pub fn string() -> Self {
        Self::of(SchemaKind::String {
            allowed: Vec::new(),
        })
    }

    /// A string restricted to the given values (exact match).
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(SchemaKind::String {
            allowed: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Any number.
    pub fn number() -> Self {
        Self::of(SchemaKind::Number)
    }

    /// A whole number.
    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer {
            minimum: None,
            maximum: None,
        })
    }

    /// A boolean.
    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    /// An array of `items`.
    pub fn array(items: Schema) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
            max_items: None,
        })
    }

    /// A nested object.
    pub fn object(object: ObjectSchema) -> Self {
        Self::of(SchemaKind::Object(object))
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the advertised default.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Caps the number of elements. Has no effect on non-array schemas.
    pub fn with_max_items(mut self, max: usize) -> Self {
        if let SchemaKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(max);
        }
        self
    }

    /// Sets a lower bound. Has no effect on non-integer schemas.
    pub fn with_minimum(mut self, min: i64) -> Self {
        if let SchemaKind::Integer { minimum, .. } = &mut self.kind {
            *minimum = Some(min);
        }
        self
    }

    /// Sets an upper bound. Has no effect on non-integer schemas.
    pub fn with_maximum(mut self, max: i64) -> Self {
        if let SchemaKind::Integer { maximum, .. } = &mut self.kind {
            *maximum = Some(max);
        }
        self
    }

    /// Returns the JSON type name of this node.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SchemaKind::String { .. } => "string",
            SchemaKind::Number => "number",
            SchemaKind::Integer { .. } => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object(_) => "object",
        }
    }

    /// Renders this node as a JSON Schema fragment.
    pub fn to_json_schema(&self) -> Value {
        let mut out = match &self.kind {
            SchemaKind::Object(object) => return self.decorate(object.to_json_schema()),
            SchemaKind::String { allowed } => {
                let mut out = Map::new();
                if !allowed.is_empty() {
                    out.insert(
                        "enum".to_string(),
                        Value::Array(allowed.iter().cloned().map(Value::String).collect()),
                    );
                }
                out
            }
            SchemaKind::Integer { minimum, maximum } => {
                let mut out = Map::new();
                if let Some(min) = minimum {
                    out.insert("minimum".to_string(), Value::from(*min));
                }
                if let Some(max) = maximum {
                    out.insert("maximum".to_string(), Value::from(*max));
                }
                out
            }
            SchemaKind::Array { items, max_items } => {
                let mut out = Map::new();
                out.insert("items".to_string(), items.to_json_schema());
                if let Some(max) = max_items {
                    out.insert("maxItems".to_string(), Value::from(*max));
                }
                out
            }
            SchemaKind::Number | SchemaKind::Boolean => Map::new(),
        };
        out.insert("type".to_string(), Value::from(self.type_name()));
        self.decorate(Value::Object(out))
    }

    fn decorate(&self, mut rendered: Value) -> Value {
        if let Value::Object(map) = &mut rendered {
            if let Some(description) = &self.description {
                map.insert("description".to_string(), Value::from(description.as_str()));
            }
            if let Some(default) = &self.default {
                map.insert("default".to_string(), default.clone());
            }
        }
        rendered
    }
}

/// The fields of an object schema, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    properties: Vec<(String, Schema)>,
    required: Vec<String>,
    closed: bool,
}

impl ObjectSchema {
    /// Creates an empty, open object schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an optional field.
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.push((name.into(), schema));
        self
    }

    /// Declares a required field.
    pub fn required_property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.push((name, schema));
        self
    }

    /// Rejects fields that are not declared.
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    /// Iterates over declared fields in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.properties.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    /// Looks up a declared field.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, schema)| schema)
    }

    /// Names of the required fields.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Returns true if undeclared fields are rejected.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Renders the object as a JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
            .collect();

        let mut out = Map::new();
        out.insert("type".to_string(), Value::from("object"));
        out.insert("properties".to_string(), Value::Object(properties));
        out.insert(
            "required".to_string(),
            Value::Array(self.required.iter().cloned().map(Value::String).collect()),
        );
        if self.closed {
            out.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        Value::Object(out)
    }
}
