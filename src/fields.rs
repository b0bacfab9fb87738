//! Named event values, the keyword arguments of a `log` call
//!
//! Values are rendered to text when inserted; escaping happens later, when the
//! emitter walks the schema. Insertion order carries no meaning.

use std::collections::HashMap;
use std::fmt::Display;

use serde_json::Value;

use crate::error::{EventlogError, Result};

/// Name-keyed bag of optional values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    values: HashMap<String, Option<String>>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value (builder style); a repeated name overwrites the earlier value
    pub fn with(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.insert(name, value);
        self
    }

    /// Add an absent value, rendered as `null`
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.values.insert(name.into(), None);
        self
    }

    pub fn with_opt<V: Display>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.values.insert(name.into(), value.map(|v| v.to_string()));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Display) {
        self.values.insert(name.into(), Some(value.to_string()));
    }

    /// Build from a JSON object.
    ///
    /// `null` becomes an absent value, strings are taken verbatim and every
    /// other value uses its compact JSON text.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(EventlogError::Config(format!(
                "event values must be a JSON object, got {}",
                json_type_name(&value)
            )));
        };

        let values = map
            .into_iter()
            .map(|(k, v)| {
                let rendered = match v {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                };
                (k, rendered)
            })
            .collect();

        Ok(Self { values })
    }

    /// Look up a field.
    ///
    /// Outer `None`: the caller did not supply it. Inner `None`: supplied as null.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.values.get(name).map(|v| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
