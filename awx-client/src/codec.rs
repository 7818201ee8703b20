//! Wire codec
//!
//! JSON records as exchanged with the controller, the tagged representation
//! of fields whose wire type varies, and canonical rendering of opaque JSON.

use serde_json::{Map, Value as JsonValue};

use crate::error::{ApiError, ApiResult};

/// A decoded JSON object body
pub type Record = Map<String, JsonValue>;

/// A wire field that may be missing, `null`, a primitive, or a nested document
#[derive(Debug, Clone, PartialEq)]
pub enum WireField {
    Absent,
    Null,
    Str(String),
    Int(i64),
    Bool(bool),
    /// Object, array or non-integral number
    Obj(JsonValue),
}

impl WireField {
    /// Decode one field of a record
    pub fn decode(record: &Record, key: &str) -> Self {
        match record.get(key) {
            None => WireField::Absent,
            Some(value) => Self::from_json(value),
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => WireField::Null,
            JsonValue::String(s) => WireField::Str(s.clone()),
            JsonValue::Bool(b) => WireField::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => WireField::Int(i),
                None => WireField::Obj(value.clone()),
            },
            other => WireField::Obj(other.clone()),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            WireField::Absent => "absent",
            WireField::Null => "null",
            WireField::Str(_) => "string",
            WireField::Int(_) => "integer",
            WireField::Bool(_) => "boolean",
            WireField::Obj(JsonValue::Array(_)) => "array",
            WireField::Obj(_) => "object",
        }
    }

    /// Whether the field carries nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, WireField::Absent | WireField::Null)
    }

    fn mismatch(&self, field: &str, expected: &'static str) -> ApiError {
        ApiError::TypeMismatch {
            field: field.to_string(),
            expected,
            got: self.variant_name(),
        }
    }

    /// Project onto an object id
    ///
    /// Summary objects (`{"id": 4, "name": ...}`) project onto their `id`;
    /// numeric strings are accepted as well.
    pub fn into_id(self, field: &str) -> ApiResult<Option<i64>> {
        match self {
            WireField::Absent | WireField::Null => Ok(None),
            WireField::Int(i) => Ok(Some(i)),
            WireField::Str(ref s) if s.is_empty() => Ok(None),
            WireField::Str(ref s) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.mismatch(field, "integer")),
            WireField::Obj(JsonValue::Object(ref obj)) => match obj.get("id") {
                Some(JsonValue::Number(n)) if n.is_i64() => Ok(n.as_i64()),
                _ => Err(self.mismatch(field, "integer")),
            },
            other => Err(other.mismatch(field, "integer")),
        }
    }

    /// Project onto a string
    pub fn into_string(self, field: &str) -> ApiResult<Option<String>> {
        match self {
            WireField::Absent | WireField::Null => Ok(None),
            WireField::Str(s) => Ok(Some(s)),
            WireField::Int(i) => Ok(Some(i.to_string())),
            other => Err(other.mismatch(field, "string")),
        }
    }

    /// Project onto a canonical JSON string
    ///
    /// A string that is not itself JSON (e.g. YAML text) is kept verbatim.
    pub fn into_json(self, field: &str) -> ApiResult<Option<String>> {
        match self {
            WireField::Absent | WireField::Null => Ok(None),
            WireField::Obj(value) => Ok(Some(canonical_json(&value))),
            WireField::Str(s) if s.trim().is_empty() => Ok(None),
            WireField::Str(s) => match serde_json::from_str::<JsonValue>(&s) {
                Ok(value @ (JsonValue::Object(_) | JsonValue::Array(_))) => {
                    Ok(Some(canonical_json(&value)))
                }
                _ => Ok(Some(s)),
            },
            other => Err(other.mismatch(field, "object")),
        }
    }
}

/// Render JSON with object keys sorted at every level
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Parse a JSON document and render it canonically
pub fn canonical_json_str(raw: &str) -> Result<String, serde_json::Error> {
    let value: JsonValue = serde_json::from_str(raw)?;
    Ok(canonical_json(&value))
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Builder for request bodies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Record,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the field only when a value is present; otherwise omit it
    pub fn set_opt<V: Into<JsonValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Send an explicit `null`
    pub fn set_null(mut self, key: impl Into<String>) -> Self {
        self.fields.insert(key.into(), JsonValue::Null);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }
}

impl From<Record> for Payload {
    fn from(fields: Record) -> Self {
        Self { fields }
    }
}
