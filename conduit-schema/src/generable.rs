//! The `Generable`/`PartiallyGenerated` contract (`spec.md §4.5`).
//!
//! A code-generation layer outside this crate (a derive macro, or hand
//! written code as in the tests below) implements these traits for a
//! concrete type: `generation_schema()` describes the type's shape,
//! `from_content`/`to_content` convert between [`GeneratedContent`] and the
//! type, and the associated `Partial` type mirrors the same shape with every
//! field optional, for consuming in-progress structured-output streams.

use conduit_core::ConduitError;

use crate::content::GeneratedContent;
use crate::schema::GenerationSchema;

/// A type that can be produced as structured output.
pub trait Generable: Sized {
    /// The partially-generated counterpart, consumed while a stream of
    /// structured output is still in flight.
    type Partial: PartiallyGenerated;

    /// The JSON-Schema description of this type's shape.
    fn generation_schema() -> GenerationSchema;

    /// Build `Self` from a fully-generated content tree.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::ConversionFailed` if `content` does not match
    /// the shape this type expects.
    fn from_content(content: &GeneratedContent) -> Result<Self, ConduitError>;

    /// Render `self` back into a content tree, e.g. for few-shot examples.
    fn to_content(&self) -> GeneratedContent;
}

/// The partially-generated counterpart of a [`Generable`] type.
///
/// Implementations never fail to construct from a partial content tree:
/// fields not yet present simply decode as `None` (or an empty collection),
/// since the tree may represent a snapshot mid-stream.
pub trait PartiallyGenerated: Sized + Clone + PartialEq {
    /// Build a partial value from a (possibly incomplete) content tree.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::ConversionFailed` only if a field that *is*
    /// present has the wrong shape (e.g. a string where a number was
    /// expected) — missing fields are never an error.
    fn from_partial_content(content: &GeneratedContent) -> Result<Self, ConduitError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaNode;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    struct WeatherArgs {
        location: String,
        unit: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct PartialWeatherArgs {
        location: Option<String>,
        unit: Option<String>,
    }

    impl Generable for WeatherArgs {
        type Partial = PartialWeatherArgs;

        fn generation_schema() -> GenerationSchema {
            let mut properties = BTreeMap::new();
            properties.insert("location".to_string(), SchemaNode::string());
            properties.insert("unit".to_string(), SchemaNode::string_enum(vec![
                "celsius".to_string(),
                "fahrenheit".to_string(),
            ]));
            GenerationSchema::single(
                "WeatherArgs",
                SchemaNode::object(properties, vec!["location".to_string()]),
            )
        }

        fn from_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            let location = content
                .get("location")
                .and_then(GeneratedContent::as_str)
                .ok_or_else(|| ConduitError::ConversionFailed("missing `location`".to_string()))?
                .to_string();
            let unit = content
                .get("unit")
                .and_then(GeneratedContent::as_str)
                .map(str::to_string);
            Ok(Self { location, unit })
        }

        fn to_content(&self) -> GeneratedContent {
            let mut props = vec![("location".to_string(), GeneratedContent::string(&self.location))];
            if let Some(unit) = &self.unit {
                props.push(("unit".to_string(), GeneratedContent::string(unit)));
            }
            GeneratedContent::object(props)
        }
    }

    impl PartiallyGenerated for PartialWeatherArgs {
        fn from_partial_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            Ok(Self {
                location: content.get("location").and_then(GeneratedContent::as_str).map(str::to_string),
                unit: content.get("unit").and_then(GeneratedContent::as_str).map(str::to_string),
            })
        }
    }

    #[test]
    fn from_content_builds_the_full_type() {
        let content =
            GeneratedContent::from_json_str(r#"{"location": "Boston", "unit": "celsius"}"#).unwrap();
        let args = WeatherArgs::from_content(&content).unwrap();
        assert_eq!(args.location, "Boston");
        assert_eq!(args.unit.as_deref(), Some("celsius"));
    }

    #[test]
    fn from_content_fails_when_required_field_missing() {
        let content = GeneratedContent::from_json_str(r#"{"unit": "celsius"}"#).unwrap();
        assert!(WeatherArgs::from_content(&content).is_err());
    }

    #[test]
    fn partial_tolerates_missing_fields_mid_stream() {
        let (content, is_complete) =
            GeneratedContent::from_partial_json_str(r#"{"location": "Bos"#).unwrap();
        assert!(!is_complete);
        let partial = PartialWeatherArgs::from_partial_content(&content).unwrap();
        assert_eq!(partial.location.as_deref(), Some("Bos"));
        assert_eq!(partial.unit, None);
    }

    #[test]
    fn to_content_round_trips_through_from_content() {
        let args = WeatherArgs {
            location: "Denver".to_string(),
            unit: None,
        };
        let content = args.to_content();
        let rebuilt = WeatherArgs::from_content(&content).unwrap();
        assert_eq!(args, rebuilt);
    }
}
