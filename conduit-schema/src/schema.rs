//! `GenerationSchema`: a tree-shaped JSON-Schema descriptor (`spec.md §3`/§4.5).
//!
//! Serialization is deterministic — object keys sorted, `required` arrays
//! canonically ordered — so two schemas built from the same type produce
//! byte-identical JSON, which golden-file tests rely on.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// One node of a `GenerationSchema` tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Human-readable field/type description, if any.
    pub description: Option<String>,
    /// The shape of this node.
    pub kind: SchemaKind,
}

impl SchemaNode {
    /// Wrap a [`SchemaKind`] with no description.
    #[must_use]
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            description: None,
            kind,
        }
    }

    /// Attach a description, replacing any existing one.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The shape of a [`SchemaNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// A JSON object with named, typed properties.
    Object {
        /// Property name to schema node.
        properties: BTreeMap<String, SchemaNode>,
        /// Property names that must be present. Canonicalized to lexical
        /// order on construction so serialization is deterministic.
        required: Vec<String>,
        /// Whether properties outside `properties` are permitted.
        ///
        /// An encoder flag (see [`GenerationSchema::to_json`]) may suppress
        /// emitting this field entirely, per `spec.md §4.5`.
        additional_properties: bool,
    },
    /// A JSON array of a single item type.
    Array {
        /// The schema every item must satisfy.
        items: Box<SchemaNode>,
        /// Minimum element count, if bounded.
        min_items: Option<usize>,
        /// Maximum element count, if bounded.
        max_items: Option<usize>,
    },
    /// A JSON string, optionally restricted to an enumeration.
    String {
        /// Allowed values, if this is an enum.
        enum_values: Option<Vec<String>>,
    },
    /// A JSON number (may carry a fractional part).
    Number {
        /// Inclusive lower bound, if any.
        minimum: Option<f64>,
        /// Inclusive upper bound, if any.
        maximum: Option<f64>,
    },
    /// A JSON integer.
    Integer {
        /// Inclusive lower bound, if any.
        minimum: Option<i64>,
        /// Inclusive upper bound, if any.
        maximum: Option<i64>,
    },
    /// A JSON boolean.
    Boolean,
    /// The JSON `null` literal.
    Null,
    /// A reference to a named entry in the owning [`GenerationSchema`]'s
    /// `$defs` registry, keyed by fully qualified type name.
    Ref(String),
}

impl SchemaNode {
    /// A required (non-optional) string property with no enum restriction.
    #[must_use]
    pub fn string() -> Self {
        Self::new(SchemaKind::String { enum_values: None })
    }

    /// A string restricted to the given enumeration.
    #[must_use]
    pub fn string_enum(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(SchemaKind::String {
            enum_values: Some(values.into_iter().map(Into::into).collect()),
        })
    }

    /// A number with no range restriction.
    #[must_use]
    pub fn number() -> Self {
        Self::new(SchemaKind::Number {
            minimum: None,
            maximum: None,
        })
    }

    /// An integer with no range restriction.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(SchemaKind::Integer {
            minimum: None,
            maximum: None,
        })
    }

    /// A boolean.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    /// An array of `items`, unbounded.
    #[must_use]
    pub fn array(items: SchemaNode) -> Self {
        Self::new(SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    /// An object with the given properties; `required` is canonicalized to
    /// lexical order.
    #[must_use]
    pub fn object(
        properties: impl IntoIterator<Item = (impl Into<String>, SchemaNode)>,
        required: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut required: Vec<String> = required.into_iter().map(Into::into).collect();
        required.sort();
        Self::new(SchemaKind::Object {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
            required,
            additional_properties: false,
        })
    }

    /// A `$ref` into the owning schema's `$defs` registry.
    #[must_use]
    pub fn reference(type_name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Ref(type_name.into()))
    }

    fn to_json(&self, suppress_additional_properties: bool) -> Value {
        // `serde_json`'s `preserve_order` feature (needed elsewhere for
        // `GeneratedContent::from_json_value`) makes `Map` insertion-ordered,
        // so keys are collected into a `BTreeMap` first and then replayed in
        // sorted order to keep output deterministic regardless of that
        // feature.
        let mut map: BTreeMap<String, Value> = BTreeMap::new();
        if let Some(description) = &self.description {
            map.insert("description".to_string(), Value::String(description.clone()));
        }
        match &self.kind {
            SchemaKind::Object {
                properties,
                required,
                additional_properties,
            } => {
                map.insert("type".to_string(), Value::String("object".to_string()));
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json(suppress_additional_properties)))
                    .collect();
                map.insert("properties".to_string(), Value::Object(props));
                if !required.is_empty() {
                    let mut required = required.clone();
                    required.sort();
                    map.insert(
                        "required".to_string(),
                        Value::Array(required.into_iter().map(Value::String).collect()),
                    );
                }
                if !suppress_additional_properties {
                    map.insert(
                        "additionalProperties".to_string(),
                        Value::Bool(*additional_properties),
                    );
                }
            }
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                map.insert("type".to_string(), Value::String("array".to_string()));
                map.insert("items".to_string(), items.to_json(suppress_additional_properties));
                if let Some(min) = min_items {
                    map.insert("minItems".to_string(), Value::Number((*min).into()));
                }
                if let Some(max) = max_items {
                    map.insert("maxItems".to_string(), Value::Number((*max).into()));
                }
            }
            SchemaKind::String { enum_values } => {
                map.insert("type".to_string(), Value::String("string".to_string()));
                if let Some(values) = enum_values {
                    map.insert(
                        "enum".to_string(),
                        Value::Array(values.iter().cloned().map(Value::String).collect()),
                    );
                }
            }
            SchemaKind::Number { minimum, maximum } => {
                map.insert("type".to_string(), Value::String("number".to_string()));
                if let Some(min) = minimum {
                    map.insert(
                        "minimum".to_string(),
                        serde_json::Number::from_f64(*min).map_or(Value::Null, Value::Number),
                    );
                }
                if let Some(max) = maximum {
                    map.insert(
                        "maximum".to_string(),
                        serde_json::Number::from_f64(*max).map_or(Value::Null, Value::Number),
                    );
                }
            }
            SchemaKind::Integer { minimum, maximum } => {
                map.insert("type".to_string(), Value::String("integer".to_string()));
                if let Some(min) = minimum {
                    map.insert("minimum".to_string(), Value::Number((*min).into()));
                }
                if let Some(max) = maximum {
                    map.insert("maximum".to_string(), Value::Number((*max).into()));
                }
            }
            SchemaKind::Boolean => {
                map.insert("type".to_string(), Value::String("boolean".to_string()));
            }
            SchemaKind::Null => {
                map.insert("type".to_string(), Value::String("null".to_string()));
            }
            SchemaKind::Ref(name) => {
                map.insert(
                    "$ref".to_string(),
                    Value::String(format!("#/$defs/{name}")),
                );
            }
        }
        Value::Object(map.into_iter().collect())
    }
}

/// A tree-structured JSON-Schema value with a `$defs` registry and a root
/// `$ref`, per `spec.md §3`/§4.5.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSchema {
    /// Named type definitions, keyed by fully qualified type name.
    pub defs: BTreeMap<String, SchemaNode>,
    /// The name of the root type, referenced as `$ref: "#/$defs/<root>"`.
    pub root: String,
}

impl GenerationSchema {
    /// Build a schema from a root type name and its definitions.
    ///
    /// `root` must be a key of `defs`.
    #[must_use]
    pub fn new(root: impl Into<String>, defs: BTreeMap<String, SchemaNode>) -> Self {
        Self {
            defs,
            root: root.into(),
        }
    }

    /// A single-type schema with no nested named types.
    #[must_use]
    pub fn single(type_name: impl Into<String>, node: SchemaNode) -> Self {
        let type_name = type_name.into();
        let mut defs = BTreeMap::new();
        defs.insert(type_name.clone(), node);
        Self::new(type_name, defs)
    }

    /// Serialize to the canonical `serde_json::Value` form: sorted keys
    /// (via `BTreeMap`), canonical `required` order, `$defs` registry, and a
    /// root `$ref`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        self.to_json_with(false)
    }

    /// Like [`Self::to_json`], optionally suppressing `additionalProperties`
    /// on every object node (`spec.md §4.5`'s encoder flag).
    #[must_use]
    pub fn to_json_with(&self, suppress_additional_properties: bool) -> Value {
        let mut defs = Map::new();
        for (name, node) in &self.defs {
            defs.insert(name.clone(), node.to_json(suppress_additional_properties));
        }
        let mut map = Map::new();
        map.insert("$defs".to_string(), Value::Object(defs));
        map.insert(
            "$ref".to_string(),
            Value::String(format!("#/$defs/{}", self.root)),
        );
        Value::Object(map)
    }

    /// The compact JSON string form.
    #[must_use]
    pub fn json_string(&self) -> String {
        serde_json::to_string(&self.to_json()).expect("schema JSON is always serializable")
    }

    /// The pretty-printed JSON string form.
    #[must_use]
    pub fn json_string_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).expect("schema JSON is always serializable")
    }
}
