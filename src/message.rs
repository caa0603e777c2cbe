//! Borrowed, shape-tolerant view over an untyped mailbox message.
//!
//! Messages arrive as `serde_json::Value` trees whose fields are all optional
//! and whose types are never verified upstream. Every accessor here returns a
//! `Shape` instead of failing, so callers can tell "absent" (silently empty)
//! apart from "present but the wrong type" (worth a diagnostic).
//!
//! Relevant layout:
//!
//! ```text
//! { "id": "...",
//!   "payload": {
//!     "headers": [ { "name": "...", "value": "..." } ],
//!     "parts":   [ { "mimeType": "...", "body": { "data": "..." } } ] } }
//! ```

use serde_json::{Map, Value};

/// Outcome of looking up one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<T> {
    /// Field not present (or JSON `null`).
    Missing,
    /// Field present with an unexpected JSON type; carries the type found.
    Mismatch(&'static str),
    Found(T),
}

impl<T> Shape<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Shape::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Shape::Missing)
    }
}

/// JSON type name used in diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Shape<&'a Value> {
    match obj.get(key) {
        None | Some(Value::Null) => Shape::Missing,
        Some(v) => Shape::Found(v),
    }
}

fn object_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Shape<&'a Map<String, Value>> {
    match field(obj, key) {
        Shape::Found(Value::Object(m)) => Shape::Found(m),
        Shape::Found(other) => Shape::Mismatch(type_name(other)),
        _ => Shape::Missing,
    }
}

fn array_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Shape<&'a [Value]> {
    match field(obj, key) {
        Shape::Found(Value::Array(items)) => Shape::Found(items.as_slice()),
        Shape::Found(other) => Shape::Mismatch(type_name(other)),
        _ => Shape::Missing,
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Shape<&'a str> {
    match field(obj, key) {
        Shape::Found(Value::String(s)) => Shape::Found(s.as_str()),
        Shape::Found(other) => Shape::Mismatch(type_name(other)),
        _ => Shape::Missing,
    }
}

/// Top-level message.
#[derive(Debug, Clone, Copy)]
pub struct MessageView<'a> {
    root: &'a Map<String, Value>,
}

impl<'a> MessageView<'a> {
    /// `Err` carries the JSON type when the message is not an object.
    pub fn new(value: &'a Value) -> Result<Self, &'static str> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(type_name(other)),
        }
    }

    pub fn id(&self) -> Option<&'a str> {
        str_field(self.root, "id").found()
    }

    pub fn payload(&self) -> Shape<PayloadView<'a>> {
        match object_field(self.root, "payload") {
            Shape::Found(obj) => Shape::Found(PayloadView { obj }),
            Shape::Mismatch(t) => Shape::Mismatch(t),
            Shape::Missing => Shape::Missing,
        }
    }

    /// First `Subject` header value, if any well-formed one exists.
    pub fn subject(&self) -> Option<&'a str> {
        let payload = self.payload().found()?;
        payload
            .headers()
            .found()?
            .iter()
            .filter_map(|h| HeaderView::new(h).ok())
            .find(|h| h.name().found() == Some("Subject"))
            .and_then(|h| h.value().found())
    }
}

/// `payload` object.
#[derive(Debug, Clone, Copy)]
pub struct PayloadView<'a> {
    obj: &'a Map<String, Value>,
}

impl<'a> PayloadView<'a> {
    pub fn headers(&self) -> Shape<&'a [Value]> {
        array_field(self.obj, "headers")
    }

    pub fn parts(&self) -> Shape<&'a [Value]> {
        array_field(self.obj, "parts")
    }
}

/// One `{name, value}` header entry.
#[derive(Debug, Clone, Copy)]
pub struct HeaderView<'a> {
    obj: &'a Map<String, Value>,
}

impl<'a> HeaderView<'a> {
    pub fn new(value: &'a Value) -> Result<Self, &'static str> {
        match value {
            Value::Object(obj) => Ok(Self { obj }),
            other => Err(type_name(other)),
        }
    }

    pub fn name(&self) -> Shape<&'a str> {
        str_field(self.obj, "name")
    }

    pub fn value(&self) -> Shape<&'a str> {
        str_field(self.obj, "value")
    }
}

/// One body part.
#[derive(Debug, Clone, Copy)]
pub struct PartView<'a> {
    obj: &'a Map<String, Value>,
}

impl<'a> PartView<'a> {
    pub fn new(value: &'a Value) -> Result<Self, &'static str> {
        match value {
            Value::Object(obj) => Ok(Self { obj }),
            other => Err(type_name(other)),
        }
    }

    pub fn mime_type(&self) -> Shape<&'a str> {
        str_field(self.obj, "mimeType")
    }

    /// `body.data`, flattened: a non-object `body` reports its own type.
    pub fn body_data(&self) -> BodyData<'a> {
        match object_field(self.obj, "body") {
            Shape::Missing => BodyData::Absent,
            Shape::Mismatch(t) => BodyData::BadBody(t),
            Shape::Found(body) => match str_field(body, "data") {
                Shape::Missing => BodyData::Absent,
                Shape::Mismatch(t) => BodyData::BadData(t),
                Shape::Found(data) => BodyData::Text(data),
            },
        }
    }
}

/// Result of resolving a part's `body.data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyData<'a> {
    Absent,
    BadBody(&'static str),
    BadData(&'static str),
    Text(&'a str),
}
