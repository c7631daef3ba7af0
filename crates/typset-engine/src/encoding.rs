//! TOML encoding of template contexts
//!
//! Values TOML understands natively (booleans, numbers, strings, datetimes,
//! arrays and tables) are encoded directly. Every other value is offered to
//! the registered fallback encoders in registration order; an encoder that
//! does not handle a value returns [`EncodeError::Unconvertible`] so the next
//! one can try.
//!
//! ```text
//! Value ──► native TOML kind? ──yes──► toml::Value
//!               │ no
//!               ▼
//!        StringableEncoder ──unconvertible──► RequestEncoder ──unconvertible──► error
//! ```

use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use crate::request::HttpRequest;
use crate::value::{Context, Value, ValueKind};

/// Errors that can occur while encoding a context
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No encoder accepted a value of this kind
    #[error("Unable to convert a value of kind '{kind}' to a TOML item")]
    Unconvertible { kind: ValueKind },

    /// The encoded table could not be written as TOML text
    #[error("TOML serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl EncodeError {
    pub fn unconvertible(value: &Value) -> Self {
        EncodeError::Unconvertible { kind: value.kind() }
    }

    /// Whether this is the "not mine" signal rather than a hard failure
    pub fn is_unconvertible(&self) -> bool {
        matches!(self, EncodeError::Unconvertible { .. })
    }
}

/// Result type for encoding operations
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// A fallback encoder for values TOML cannot represent natively
///
/// Encoders must be `Send + Sync` so a registry can be shared between
/// threads rendering templates concurrently.
pub trait Encoder: Send + Sync {
    /// Human-readable name of this encoder
    fn name(&self) -> &'static str;

    /// Encode `value`, or return [`EncodeError::Unconvertible`] to defer
    ///
    /// `registry` encodes nested values through the full chain.
    fn encode(&self, value: &Value, registry: &EncoderRegistry) -> EncodeResult<toml::Value>;
}

/// Encodes precise decimals and UUIDs as their canonical string form
#[derive(Debug, Clone, Copy, Default)]
pub struct StringableEncoder;

impl Encoder for StringableEncoder {
    fn name(&self) -> &'static str {
        "stringable"
    }

    fn encode(&self, value: &Value, _registry: &EncoderRegistry) -> EncodeResult<toml::Value> {
        match value {
            Value::Decimal(decimal) => Ok(toml::Value::String(decimal.to_string())),
            Value::Uuid(uuid) => Ok(toml::Value::String(uuid.hyphenated().to_string())),
            other => Err(EncodeError::unconvertible(other)),
        }
    }
}

/// Encodes an [`HttpRequest`] as a table
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestEncoder;

impl RequestEncoder {
    fn encode_request(request: &HttpRequest) -> toml::Value {
        let mut table = toml::Table::new();
        table.insert("path".into(), toml::Value::String(request.path.clone()));
        table.insert(
            "path_info".into(),
            toml::Value::String(request.path_info.clone()),
        );
        table.insert("method".into(), toml::Value::String(request.method.clone()));
        table.insert(
            "content_type".into(),
            toml::Value::String(request.content_type.clone()),
        );
        table.insert(
            "content_params".into(),
            toml::Value::Table(string_table(&request.content_params)),
        );
        table.insert(
            "headers".into(),
            toml::Value::Table(string_table(&request.headers)),
        );
        toml::Value::Table(table)
    }
}

impl Encoder for RequestEncoder {
    fn name(&self) -> &'static str {
        "request"
    }

    fn encode(&self, value: &Value, _registry: &EncoderRegistry) -> EncodeResult<toml::Value> {
        match value {
            Value::Request(request) => Ok(Self::encode_request(request)),
            other => Err(EncodeError::unconvertible(other)),
        }
    }
}

fn string_table<'a>(entries: impl IntoIterator<Item = (&'a String, &'a String)>) -> toml::Table {
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), toml::Value::String(value.clone())))
        .collect()
}

/// Ordered chain of fallback encoders
pub struct EncoderRegistry {
    /// Registered encoders in priority order
    encoders: Vec<Box<dyn Encoder>>,
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("encoders", &self.encoder_names())
            .finish()
    }
}

impl EncoderRegistry {
    /// Registry with the built-in encoders: stringable first, then request
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(StringableEncoder));
        registry.register(Box::new(RequestEncoder));
        registry
    }

    /// Registry that only handles native TOML values
    pub fn empty() -> Self {
        Self {
            encoders: Vec::new(),
        }
    }

    /// Append an encoder; it is consulted after every encoder already registered
    pub fn register(&mut self, encoder: Box<dyn Encoder>) {
        debug!(encoder = encoder.name(), "Registered TOML encoder");
        self.encoders.push(encoder);
    }

    /// Names of the registered encoders, in consultation order
    pub fn encoder_names(&self) -> Vec<&'static str> {
        self.encoders.iter().map(|e| e.name()).collect()
    }

    /// Encode a single value
    pub fn encode(&self, value: &Value) -> EncodeResult<toml::Value> {
        match value {
            Value::Bool(b) => return Ok(toml::Value::Boolean(*b)),
            Value::Integer(i) => return Ok(toml::Value::Integer(*i)),
            Value::Float(f) => return Ok(toml::Value::Float(*f)),
            Value::String(s) => return Ok(toml::Value::String(s.clone())),
            Value::Datetime(d) => return Ok(toml::Value::Datetime(*d)),
            Value::Array(items) => {
                return items
                    .iter()
                    .map(|item| self.encode(item))
                    .collect::<EncodeResult<Vec<_>>>()
                    .map(toml::Value::Array)
            }
            Value::Table(entries) => {
                return self.encode_table(entries).map(toml::Value::Table);
            }
            _ => {}
        }

        for encoder in &self.encoders {
            match encoder.encode(value, self) {
                Ok(encoded) => {
                    trace!(encoder = encoder.name(), kind = %value.kind(), "Encoded value");
                    return Ok(encoded);
                }
                Err(e) if e.is_unconvertible() => continue,
                Err(e) => return Err(e),
            }
        }

        Err(EncodeError::unconvertible(value))
    }

    /// Encode every entry of a table
    pub fn encode_table<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> EncodeResult<toml::Table> {
        entries
            .into_iter()
            .map(|(key, value)| Ok((key.clone(), self.encode(value)?)))
            .collect()
    }

    /// Render a context as a TOML document
    ///
    /// An empty context renders as the empty string.
    pub fn to_document(&self, context: &Context) -> EncodeResult<String> {
        let table = self.encode_table(context)?;
        Ok(toml::to_string(&table)?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_stringable_encoder_accepts_decimal_and_uuid() {
        let registry = EncoderRegistry::empty();
        let uuid = Uuid::parse_str("0c997d1c-080d-4b08-9d78-5922b3b75379").unwrap();
        let cases = [
            (Value::Uuid(uuid), "0c997d1c-080d-4b08-9d78-5922b3b75379"),
            (
                Value::Decimal(Decimal::from_str("12.99").unwrap()),
                "12.99",
            ),
        ];

        for (value, expected) in cases {
            let encoded = StringableEncoder.encode(&value, &registry).unwrap();
            assert_eq!(encoded, toml::Value::String(expected.to_string()));
        }
    }

    #[test]
    fn test_stringable_encoder_rejects_other_values() {
        let registry = EncoderRegistry::empty();

        for value in [
            Value::opaque("object"),
            Value::from(HttpRequest::new("GET", "/")),
            Value::from("text"),
        ] {
            let err = StringableEncoder.encode(&value, &registry).unwrap_err();
            assert!(err.is_unconvertible());
        }
    }

    #[test]
    fn test_request_encoder() {
        let registry = EncoderRegistry::empty();
        let request = HttpRequest::new("GET", "/some/path/or/other").with_header("Cookie", "");

        let encoded = RequestEncoder
            .encode(&Value::from(request), &registry)
            .unwrap();

        let expected: toml::Table = r#"
path = "/some/path/or/other"
path_info = "/some/path/or/other"
method = "GET"
content_type = ""
content_params = {}
headers = { Cookie = "" }
"#
        .parse()
        .unwrap();
        assert_eq!(encoded, toml::Value::Table(expected));
    }

    #[test]
    fn test_request_encoder_rejects_other_values() {
        let registry = EncoderRegistry::empty();
        let err = RequestEncoder
            .encode(&Value::opaque("object"), &registry)
            .unwrap_err();
        assert!(err.is_unconvertible());
    }

    #[test]
    fn test_standard_registry_order() {
        assert_eq!(
            EncoderRegistry::standard().encoder_names(),
            vec!["stringable", "request"]
        );
    }

    #[test]
    fn test_nested_values_use_fallback_encoders() {
        let registry = EncoderRegistry::standard();
        let value = Value::Array(vec![
            Value::Decimal(Decimal::new(1050, 2)),
            Value::Table([("id".to_string(), Value::Uuid(Uuid::nil()))].into()),
        ]);

        let encoded = registry.encode(&value).unwrap();

        let items = encoded.as_array().unwrap();
        assert_eq!(items[0].as_str(), Some("10.50"));
        assert_eq!(
            items[1]["id"].as_str(),
            Some("00000000-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn test_unhandled_value_surfaces_error() {
        let registry = EncoderRegistry::standard();

        let err = registry.encode(&Value::Null).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Unconvertible {
                kind: ValueKind::Null
            }
        ));
    }

    #[test]
    fn test_empty_registry_rejects_decimals() {
        let registry = EncoderRegistry::empty();
        assert!(registry
            .encode(&Value::Decimal(Decimal::ONE))
            .unwrap_err()
            .is_unconvertible());
    }

    #[test]
    fn test_custom_encoder_runs_after_builtins() {
        struct NullAsEmpty;

        impl Encoder for NullAsEmpty {
            fn name(&self) -> &'static str {
                "null-as-empty"
            }

            fn encode(&self, value: &Value, _: &EncoderRegistry) -> EncodeResult<toml::Value> {
                match value {
                    Value::Null => Ok(toml::Value::String(String::new())),
                    other => Err(EncodeError::unconvertible(other)),
                }
            }
        }

        let mut registry = EncoderRegistry::standard();
        registry.register(Box::new(NullAsEmpty));

        assert_eq!(
            registry.encoder_names(),
            vec!["stringable", "request", "null-as-empty"]
        );
        assert_eq!(
            registry.encode(&Value::Null).unwrap(),
            toml::Value::String(String::new())
        );
    }

    #[test]
    fn test_empty_context_document() {
        let registry = EncoderRegistry::standard();
        assert_eq!(registry.to_document(&Context::new()).unwrap(), "");
    }

    #[test]
    fn test_context_document_round_trips_through_toml() {
        let registry = EncoderRegistry::standard();
        let mut context = Context::new();
        context.insert("total".into(), Value::Decimal(Decimal::new(1299, 2)));
        context.insert(
            "request".into(),
            Value::from(HttpRequest::new("GET", "/invoice")),
        );

        let document = registry.to_document(&context).unwrap();
        let parsed: toml::Table = document.parse().unwrap();

        assert_eq!(parsed["total"].as_str(), Some("12.99"));
        assert_eq!(parsed["request"]["path"].as_str(), Some("/invoice"));
        assert!(parsed["request"]["headers"].is_table());
    }
}
