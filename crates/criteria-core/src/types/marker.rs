//! Generic clinical marker values
//!
//! Facts that do not fit a typed field of the patient record live in a string-keyed
//! marker map. Values are JSON-like and read through typed accessors.

use crate::types::threshold::parse_finite;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<MarkerValue>),
    Object(BTreeMap<String, MarkerValue>),
}

impl MarkerValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MarkerValue::Null)
    }

    /// Boolean reading. Accepts real booleans and the strings "true"/"false"/"yes"/"no".
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MarkerValue::Bool(b) => Some(*b),
            MarkerValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Finite numeric reading. Booleans are never treated as numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MarkerValue::Number(n) if n.is_finite() => Some(*n),
            MarkerValue::String(s) => parse_finite(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MarkerValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Lowercased string items of a list marker. A scalar string is a one-item list.
    pub fn as_str_list(&self) -> Vec<String> {
        match self {
            MarkerValue::String(s) => vec![s.to_lowercase()],
            MarkerValue::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_lowercase))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Truthiness used for presence-style markers.
    pub fn is_truthy(&self) -> bool {
        match self {
            MarkerValue::Null => false,
            MarkerValue::Bool(b) => *b,
            MarkerValue::Number(n) => *n != 0.0,
            MarkerValue::String(s) => !s.is_empty(),
            MarkerValue::Array(items) => !items.is_empty(),
            MarkerValue::Object(map) => !map.is_empty(),
        }
    }
}

impl From<bool> for MarkerValue {
    fn from(value: bool) -> Self {
        MarkerValue::Bool(value)
    }
}

impl From<f64> for MarkerValue {
    fn from(value: f64) -> Self {
        MarkerValue::Number(value)
    }
}

impl From<&str> for MarkerValue {
    fn from(value: &str) -> Self {
        MarkerValue::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_accessor() {
        assert_eq!(MarkerValue::Bool(true).as_bool(), Some(true));
        assert_eq!(MarkerValue::from("No").as_bool(), Some(false));
        assert_eq!(MarkerValue::Number(1.0).as_bool(), None);
    }

    #[test]
    fn test_numeric_accessor_rejects_bool() {
        assert_eq!(MarkerValue::Bool(true).as_f64(), None);
        assert_eq!(MarkerValue::Number(3.0).as_f64(), Some(3.0));
        assert_eq!(MarkerValue::from("42").as_f64(), Some(42.0));
        assert_eq!(MarkerValue::Number(f64::NAN).as_f64(), None);
    }

    #[test]
    fn test_str_list() {
        let list = MarkerValue::Array(vec![
            MarkerValue::from("Lenalidomide"),
            MarkerValue::Number(1.0),
            MarkerValue::from("Bortezomib"),
        ]);
        assert_eq!(list.as_str_list(), vec!["lenalidomide", "bortezomib"]);
        assert_eq!(MarkerValue::from("X").as_str_list(), vec!["x"]);
        assert!(MarkerValue::Null.as_str_list().is_empty());
    }

    #[test]
    fn test_deserialize_nested() {
        let value: MarkerValue =
            serde_json::from_str(r#"{"a": [1, true, "x"], "b": null}"#).unwrap();
        match value {
            MarkerValue::Object(map) => {
                assert_eq!(map.get("b"), Some(&MarkerValue::Null));
                assert!(map.get("a").unwrap().is_truthy());
            }
            _ => panic!("Expected Object"),
        }
    }
}
