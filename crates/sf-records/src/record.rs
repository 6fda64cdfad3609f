//! Flat record model and named-field access.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key Salesforce uses for record metadata (`{"type": "Account", "url": ...}`).
pub(crate) const ATTRIBUTES: &str = "attributes";

/// Looks up a field's value by name.
///
/// This is the only way the rest of the crate reads identifier or
/// external-id values, so any type that can answer "what is field X" can be
/// validated and routed.
pub trait FieldAccess {
    /// String form of the named field, or [`FieldNotFound`].
    fn field(&self, name: &str) -> Result<String, FieldNotFound>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{0}' not found")]
pub struct FieldNotFound(pub String);

/// One record: field name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Value for `name`; exact match first, then case-insensitive.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Remove `name` (same matching rules as [`Record::get`]).
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.shift_remove(name) {
            return Some(value);
        }
        let key = self
            .0
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()?;
        self.0.shift_remove(&key)
    }

    /// Field names in order, excluding record metadata.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|key| *key != ATTRIBUTES)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

impl FieldAccess for Record {
    fn field(&self, name: &str) -> Result<String, FieldNotFound> {
        self.get(name)
            .map(value_to_string)
            .ok_or_else(|| FieldNotFound(name.to_string()))
    }
}

impl FieldAccess for Map<String, Value> {
    fn field(&self, name: &str) -> Result<String, FieldNotFound> {
        self.get(name)
            .map(value_to_string)
            .ok_or_else(|| FieldNotFound(name.to_string()))
    }
}

/// Text form of a field value. `null` is empty; nested values are JSON.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
