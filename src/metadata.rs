use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single metadata value: a closed union of the scalar types the store
/// accepts. The store treats metadata as opaque except for filter lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// String-keyed metadata attached to one stored vector.
pub type Metadata = BTreeMap<String, MetaValue>;

impl MetaValue {
    /// Equality used by search filters. Same-variant values compare directly;
    /// integers and floats compare numerically; everything else is unequal.
    pub fn filter_matches(&self, other: &MetaValue) -> bool {
        match (self, other) {
            (MetaValue::Str(a), MetaValue::Str(b)) => a == b,
            (MetaValue::Int(a), MetaValue::Int(b)) => a == b,
            (MetaValue::Float(a), MetaValue::Float(b)) => a == b,
            (MetaValue::Bool(a), MetaValue::Bool(b)) => a == b,
            (MetaValue::Int(a), MetaValue::Float(b)) | (MetaValue::Float(b), MetaValue::Int(a)) => {
                *a as f64 == *b
            }
            _ => false,
        }
    }

    /// Untagged JSON representation for CLI output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetaValue::Str(s) => serde_json::Value::String(s.clone()),
            MetaValue::Int(i) => serde_json::Value::from(*i),
            MetaValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            MetaValue::Bool(b) => serde_json::Value::from(*b),
        }
    }

    /// Parse a CLI-supplied scalar, preferring bool, then integer, then
    /// float, falling back to a plain string.
    pub fn parse_scalar(raw: &str) -> MetaValue {
        match raw {
            "true" => return MetaValue::Bool(true),
            "false" => return MetaValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return MetaValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return MetaValue::Float(f);
        }
        MetaValue::Str(raw.to_string())
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Str(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Str(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<usize> for MetaValue {
    fn from(value: usize) -> Self {
        MetaValue::Int(value as i64)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

/// True when `meta` satisfies every `(key, value)` pair in `filters`.
/// A missing key or a mismatched value excludes the record.
pub fn metadata_matches(meta: &Metadata, filters: &Metadata) -> bool {
    filters
        .iter()
        .all(|(key, expected)| meta.get(key).is_some_and(|v| v.filter_matches(expected)))
}

/// Render a full metadata map as a JSON object.
pub fn metadata_to_json(meta: &Metadata) -> serde_json::Value {
    serde_json::Value::Object(
        meta.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}
