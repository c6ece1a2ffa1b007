//! JSON value types.
//!
//! A parsed document is a tree of [`JsonValue`]s rooted at a [`JsonObject`].
//! Every container owns its children; dropping a value drops its whole
//! subtree exactly once.
//!
//! Object properties keep insertion order so enumeration by index is
//! deterministic. Re-inserting an existing key replaces the value in place.

use std::sync::OnceLock;

use indexmap::IndexMap;

/// Kind of a JSON value. Booleans report `True` or `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
    /// Any number literal.
    Number,
    /// A quoted string.
    String,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
}

impl JsonType {
    /// Returns the type name as a string for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::True | JsonType::False => "boolean",
            JsonType::Null => "null",
        }
    }
}

/// A JSON value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    /// JSON null literal
    #[default]
    Null,
    /// JSON boolean (true/false)
    Bool(bool),
    /// JSON number, decoded to a double
    Number(f64),
    /// JSON string, unescaped
    String(String),
    /// JSON array of values
    Array(Vec<JsonValue>),
    /// JSON object
    Object(JsonObject),
}

/// A JSON object: unique property names mapped to values, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonObject {
    properties: IndexMap<String, JsonValue>,
}

fn empty_object() -> &'static JsonObject {
    static EMPTY: OnceLock<JsonObject> = OnceLock::new();
    EMPTY.get_or_init(JsonObject::default)
}

impl JsonValue {
    /// Kind of this value.
    pub fn json_type(&self) -> JsonType {
        match self {
            JsonValue::Null => JsonType::Null,
            JsonValue::Bool(true) => JsonType::True,
            JsonValue::Bool(false) => JsonType::False,
            JsonValue::Number(_) => JsonType::Number,
            JsonValue::String(_) => JsonType::String,
            JsonValue::Array(_) => JsonType::Array,
            JsonValue::Object(_) => JsonType::Object,
        }
    }

    /// Returns the type name as a string for error messages.
    pub fn type_name(&self) -> &'static str {
        self.json_type().name()
    }

    /// Returns true if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// Returns the object if this is an Object, None otherwise.
    pub fn try_as_object(&self) -> Option<&JsonObject> {
        match self {
            JsonValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Returns the elements if this is an Array, None otherwise.
    pub fn try_as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the number if this is a Number, None otherwise.
    pub fn try_as_number(&self) -> Option<f64> {
        match self {
            JsonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string if this is a String, None otherwise.
    pub fn try_as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a Bool, None otherwise.
    pub fn try_as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The object, or an empty object for any other kind.
    pub fn as_object(&self) -> &JsonObject {
        self.try_as_object().unwrap_or_else(|| empty_object())
    }

    /// The elements, or an empty slice for any other kind.
    pub fn as_array(&self) -> &[JsonValue] {
        self.try_as_array().unwrap_or(&[])
    }

    /// The number, or `0.0` for any other kind.
    pub fn as_number(&self) -> f64 {
        self.try_as_number().unwrap_or(0.0)
    }

    /// The string, or `""` for any other kind.
    pub fn as_str(&self) -> &str {
        self.try_as_str().unwrap_or("")
    }

    /// The boolean, or `false` for any other kind.
    pub fn as_bool(&self) -> bool {
        self.try_as_bool().unwrap_or(false)
    }

    /// Number of elements if this is an Array, 0 otherwise.
    pub fn array_len(&self) -> usize {
        self.as_array().len()
    }

    /// Get a value from an object by key.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.try_as_object().and_then(|o| o.get(key))
    }

    /// Get a value from an array by index.
    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        self.try_as_array().and_then(|a| a.get(index))
    }
}

impl JsonObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Property at `index` in insertion order.
    pub fn property(&self, index: usize) -> Option<(&str, &JsonValue)> {
        self.properties
            .get_index(index)
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Property value by name.
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }

    /// Returns true if a property with this name exists.
    pub fn contains_key(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Iterate properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert a property. An existing property with the same name keeps its
    /// position and has its value replaced; the old value is returned.
    pub fn insert(&mut self, name: String, value: JsonValue) -> Option<JsonValue> {
        self.properties.insert(name, value)
    }

    pub(crate) fn properties_mut(&mut self) -> &mut IndexMap<String, JsonValue> {
        &mut self.properties
    }
}

impl From<JsonObject> for JsonValue {
    fn from(object: JsonObject) -> Self {
        JsonValue::Object(object)
    }
}
