//! `GeneratedContent`: a dynamic, order-preserving JSON value (`spec.md §3`/§4.5).

use conduit_core::ConduitError;
use conduit_json::decode_incremental;
use serde_json::Value;

/// A numeric leaf, keeping integer and floating-point representations
/// distinguishable per `spec.md §3`'s "separate int/float accessors".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratedNumber {
    /// An integral value.
    Int(i64),
    /// A value with a fractional part, or one too large for `i64`.
    Float(f64),
}

impl GeneratedNumber {
    fn from_json(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            GeneratedNumber::Int(i)
        } else {
            GeneratedNumber::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }

    /// This value as `f64`, regardless of representation.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            GeneratedNumber::Int(i) => *i as f64,
            GeneratedNumber::Float(f) => *f,
        }
    }

    /// This value as `i64` if it is (or exactly represents) an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedNumber::Int(i) => Some(*i),
            GeneratedNumber::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            GeneratedNumber::Float(_) => None,
        }
    }
}

/// A tagged union value mirroring JSON, with ordered arrays and
/// ordered-property objects.
///
/// `id` is an optional per-node identity used for stream-stable comparisons
/// across partial snapshots; it does not participate in structural
/// equality, which compares `value` only.
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    /// Optional stream-stable identity for this node.
    pub id: Option<String>,
    /// The JSON-shaped value itself.
    pub value: ContentValue,
}

/// The shape of a [`GeneratedContent`] node.
#[derive(Debug, Clone)]
pub enum ContentValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, with int/float distinguished.
    Number(GeneratedNumber),
    /// A string.
    String(String),
    /// An ordered array of nodes.
    Array(Vec<GeneratedContent>),
    /// An ordered-property object: `(name, value)` pairs in insertion order.
    Object(Vec<(String, GeneratedContent)>),
}

impl PartialEq for GeneratedContent {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialEq for ContentValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ContentValue::Null, ContentValue::Null) => true,
            (ContentValue::Bool(a), ContentValue::Bool(b)) => a == b,
            (ContentValue::Number(a), ContentValue::Number(b)) => a == b,
            (ContentValue::String(a), ContentValue::String(b)) => a == b,
            (ContentValue::Array(a), ContentValue::Array(b)) => a == b,
            (ContentValue::Object(a), ContentValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl GeneratedContent {
    /// Wrap a value with no identity.
    #[must_use]
    pub fn new(value: ContentValue) -> Self {
        Self { id: None, value }
    }

    /// Wrap a value with the given stream-stable identity.
    #[must_use]
    pub fn with_id(id: impl Into<String>, value: ContentValue) -> Self {
        Self {
            id: Some(id.into()),
            value,
        }
    }

    /// `null`.
    #[must_use]
    pub fn null() -> Self {
        Self::new(ContentValue::Null)
    }

    /// A boolean leaf.
    #[must_use]
    pub fn bool(b: bool) -> Self {
        Self::new(ContentValue::Bool(b))
    }

    /// An integer leaf.
    #[must_use]
    pub fn int(i: i64) -> Self {
        Self::new(ContentValue::Number(GeneratedNumber::Int(i)))
    }

    /// A floating-point leaf.
    #[must_use]
    pub fn float(f: f64) -> Self {
        Self::new(ContentValue::Number(GeneratedNumber::Float(f)))
    }

    /// A string leaf.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::new(ContentValue::String(s.into()))
    }

    /// An array of nodes.
    #[must_use]
    pub fn array(items: Vec<GeneratedContent>) -> Self {
        Self::new(ContentValue::Array(items))
    }

    /// An object built from a property map, in iteration order.
    #[must_use]
    pub fn object(properties: impl IntoIterator<Item = (impl Into<String>, GeneratedContent)>) -> Self {
        Self::new(ContentValue::Object(
            properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Strictly parse `json` into a `GeneratedContent` tree.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::InvalidInput` if `json` does not parse.
    pub fn from_json_str(json: &str) -> Result<Self, ConduitError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ConduitError::InvalidInput(e.to_string()))?;
        Ok(Self::from_json_value(&value))
    }

    /// Parse a possibly-incomplete `json` buffer via the partial-JSON engine
    /// (`conduit-json`), returning the best-effort tree and whether the
    /// parse was exact.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::ParseFailed` if the buffer's bracket nesting
    /// exceeds the completer's depth limit, or if nothing parseable could
    /// be produced.
    pub fn from_partial_json_str(json: &str) -> Result<(Self, bool), ConduitError> {
        let outcome =
            decode_incremental(json, 256).map_err(|e| ConduitError::ParseFailed(e.to_string()))?;
        match outcome {
            conduit_json::DecodeOutcome::Exact(v) => Ok((Self::from_json_value(&v), true)),
            conduit_json::DecodeOutcome::Partial(v) => Ok((Self::from_json_value(&v), false)),
            conduit_json::DecodeOutcome::Empty => {
                Err(ConduitError::ParseFailed("no parseable content yet".to_string()))
            }
        }
    }

    fn from_json_value(value: &Value) -> Self {
        let content = match value {
            Value::Null => ContentValue::Null,
            Value::Bool(b) => ContentValue::Bool(*b),
            Value::Number(n) => ContentValue::Number(GeneratedNumber::from_json(n)),
            Value::String(s) => ContentValue::String(s.clone()),
            Value::Array(items) => {
                ContentValue::Array(items.iter().map(Self::from_json_value).collect())
            }
            Value::Object(map) => ContentValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json_value(v)))
                    .collect(),
            ),
        };
        Self::new(content)
    }

    /// Convert back to a plain `serde_json::Value`, dropping identities.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        match &self.value {
            ContentValue::Null => Value::Null,
            ContentValue::Bool(b) => Value::Bool(*b),
            ContentValue::Number(GeneratedNumber::Int(i)) => Value::Number((*i).into()),
            ContentValue::Number(GeneratedNumber::Float(f)) => {
                serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number)
            }
            ContentValue::String(s) => Value::String(s.clone()),
            ContentValue::Array(items) => {
                Value::Array(items.iter().map(GeneratedContent::to_json_value).collect())
            }
            ContentValue::Object(props) => Value::Object(
                props
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }

    /// The value as a `bool`, if this node is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            ContentValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The value as `i64`, if this node is (or exactly represents) an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match &self.value {
            ContentValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// The value as `f64`, if this node is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            ContentValue::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    /// The value as `&str`, if this node is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ContentValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The value as a slice of array items, if this node is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[GeneratedContent]> {
        match &self.value {
            ContentValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Whether this node is JSON `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.value, ContentValue::Null)
    }

    /// Look up an object property by name, if this node is an object and
    /// the property is present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&GeneratedContent> {
        match &self.value {
            ContentValue::Object(props) => {
                props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse_of_object_preserves_property_order() {
        let content = GeneratedContent::from_json_str(r#"{"b": 1, "a": 2}"#).unwrap();
        let ContentValue::Object(props) = &content.value else {
            panic!("expected object");
        };
        assert_eq!(props[0].0, "b");
        assert_eq!(props[1].0, "a");
    }

    #[test]
    fn strict_parse_rejects_invalid_json() {
        assert!(GeneratedContent::from_json_str("{not json}").is_err());
    }

    #[test]
    fn partial_parse_of_truncated_object_succeeds_with_is_complete_false() {
        let (content, is_complete) =
            GeneratedContent::from_partial_json_str(r#"{"summary": "All good", "sco"#).unwrap();
        assert!(!is_complete);
        assert_eq!(
            content.get("summary").and_then(GeneratedContent::as_str),
            Some("All good")
        );
    }

    #[test]
    fn int_and_float_accessors_are_distinct() {
        let int_node = GeneratedContent::int(3);
        assert_eq!(int_node.as_i64(), Some(3));
        let float_node = GeneratedContent::float(3.5);
        assert_eq!(float_node.as_i64(), None);
        assert_eq!(float_node.as_f64(), Some(3.5));
    }

    #[test]
    fn equality_is_structural_and_ignores_identity() {
        let a = GeneratedContent::with_id("node-1", ContentValue::String("x".into()));
        let b = GeneratedContent::with_id("node-2", ContentValue::String("x".into()));
        assert_eq!(a, b);
    }

    #[test]
    fn round_trip_through_json_value_preserves_structure() {
        let original = GeneratedContent::object([
            ("name", GeneratedContent::string("Bob")),
            ("age", GeneratedContent::int(30)),
        ]);
        let json = original.to_json_value();
        let reparsed = GeneratedContent::from_json_str(&json.to_string()).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn get_returns_none_for_missing_property() {
        let content = GeneratedContent::object([("a", GeneratedContent::int(1))]);
        assert!(content.get("missing").is_none());
    }
}
