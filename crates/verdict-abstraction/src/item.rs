//! Input items and their canonical cache keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Field holding the text to classify.
pub const TEXT_FIELD: &str = "text";

/// Field holding the gold label of a training item.
pub const LABEL_FIELD: &str = "label";

/// An item to train on or to infer on: a set of named fields.
///
/// Every item carries at least a `text` field; training items also carry a
/// boolean `label`. Any other field is passed through to the model untouched
/// and takes part in the item's identity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Creates an item with only a `text` field.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new().with_field(TEXT_FIELD, text.into())
    }

    /// Creates a training item with `text` and `label` fields.
    #[must_use]
    pub fn labeled(text: impl Into<String>, label: bool) -> Self {
        Self::from_text(text).with_field(LABEL_FIELD, label)
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn text(&self) -> Option<&str> {
        self.get(TEXT_FIELD).and_then(Value::as_str)
    }

    pub fn label(&self) -> Option<bool> {
        self.get(LABEL_FIELD).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Canonical key of this item's field set.
    ///
    /// Fields are sorted by name (recursively for nested objects), so two
    /// items with the same fields produce the same key whatever order the
    /// fields were inserted in.
    pub fn cache_key(&self) -> CacheKey {
        let mut out = String::new();
        write_canonical_object(&self.0, &mut out);
        CacheKey(out)
    }
}

impl From<Map<String, Value>> for Item {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Item {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Canonical, order-independent encoding of an item's fields.
///
/// Used both as the in-memory cache sub-key and as the prediction store key,
/// and as the identity for deduplicating items within one inference batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_canonical_object(map: &Map<String, Value>, out: &mut String) {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (idx, (name, value)) in entries.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&Value::from(name.as_str()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
        Value::Array(values) => {
            out.push('[');
            for (idx, v) in values.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        Value::Number(number) => write_canonical_number(number, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Integral floats are written as integers so `1` and `1.0` share a key.
fn write_canonical_number(number: &Number, out: &mut String) {
    match number.as_f64() {
        Some(f) if number.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            out.push_str(&(f as i64).to_string());
        }
        _ => out.push_str(&number.to_string()),
    }
}
