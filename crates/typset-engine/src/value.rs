//! Context values
//!
//! A template context is a string-keyed table of loosely-typed [`Value`]s.
//! Values that TOML understands natively are serialized as-is; the remaining
//! kinds go through the fallback encoders of an
//! [`EncoderRegistry`](crate::encoding::EncoderRegistry).

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use toml::value::Datetime;
use uuid::Uuid;

use crate::request::HttpRequest;

/// Template context passed to [`Template::render`](crate::Template::render)
pub type Context = BTreeMap<String, Value>;

/// A value that can be placed in a template context
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Datetime(Datetime),
    Array(Vec<Value>),
    Table(BTreeMap<String, Value>),
    /// Precise decimal number (e.g. a monetary amount)
    Decimal(Decimal),
    Uuid(Uuid),
    Request(Box<HttpRequest>),
    /// A host object with no serialized form, identified by its type name
    Opaque(String),
}

/// Discriminant of a [`Value`], used for dispatch and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Datetime,
    Array,
    Table,
    Decimal,
    Uuid,
    Request,
    Opaque,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Datetime => "datetime",
            ValueKind::Array => "array",
            ValueKind::Table => "table",
            ValueKind::Decimal => "decimal",
            ValueKind::Uuid => "uuid",
            ValueKind::Request => "request",
            ValueKind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Datetime(_) => ValueKind::Datetime,
            Value::Array(_) => ValueKind::Array,
            Value::Table(_) => ValueKind::Table,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Request(_) => ValueKind::Request,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Opaque host object, e.g. a view instance
    pub fn opaque(type_name: impl Into<String>) -> Self {
        Value::Opaque(type_name.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<HttpRequest> for Value {
    fn from(value: HttpRequest) -> Self {
        Value::Request(Box::new(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(d) => Value::Datetime(d),
            toml::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => Value::Table(
                table
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if n.is_f64() {
                    Value::Float(n.as_f64().unwrap_or_default())
                } else {
                    // u64 beyond i64::MAX
                    Value::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Table(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Build a [`Context`] from a parsed TOML table
pub fn context_from_toml(table: toml::Table) -> Context {
    table
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect()
}

/// Build a [`Context`] from a JSON object; non-objects yield `None`
pub fn context_from_json(value: serde_json::Value) -> Option<Context> {
    match value {
        serde_json::Value::Object(map) => Some(
            map.into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect(),
        ),
        _ => None,
    }
}
