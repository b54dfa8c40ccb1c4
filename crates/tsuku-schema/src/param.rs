//! The untyped parameter bag that flows from a recipe's TOML through
//! decomposition into a primitive [`Step`](../../tsuku_core/action/struct.Step.html).
//!
//! A `Recipe`'s action parameters deserialize straight into a `ParamBag`;
//! typed accessors give each primitive a way to read out exactly the shape
//! it expects without a `match` on a raw `serde_json::Value` at every call
//! site. Preflight is the sole gate on parameter *correctness* -- accessors
//! here just report absence/type-mismatch as `None`, they never panic.

use std::collections::BTreeMap;
use std::fmt;

/// A tagged-union parameter value.
///
/// `BTreeMap` (rather than `HashMap`) backs `Map` so that canonical-JSON
/// serialization for the decomposition cycle guard (see
/// `tsuku_core::action::decompose`) is deterministic without an extra sort
/// step.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A string value.
    String(String),
    /// An integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
    /// A heterogeneous list.
    List(Vec<Value>),
    /// A nested string-keyed map.
    Map(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(_) | Self::Map(_) => write!(f, "{self:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::List(v.into_iter().map(Value::String).collect())
    }
}

/// A heterogeneous string-keyed parameter bag.
///
/// Constructed by deserializing a recipe action's TOML table, or
/// programmatically by composites when they emit a [`Step`] for a
/// primitive (see `tsuku_core::action::step::Step`).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ParamBag(BTreeMap<String, Value>);

impl ParamBag {
    /// An empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key, builder-style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or overwrite a key in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw lookup, without type narrowing.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True if `key` is present, regardless of its type.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Read a string parameter.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Read a string parameter, falling back to `default` when absent.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(default)
    }

    /// Read an integer parameter.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read a boolean parameter.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read a boolean parameter, falling back to `default` when absent.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Read a list-of-strings parameter. `None` if the key is absent *or*
    /// any element is not a string.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<&str>> {
        match self.0.get(key)? {
            Value::List(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Read a string-to-string map parameter. `None` if the key is absent
    /// *or* any value is not a string.
    pub fn get_str_map(&self, key: &str) -> Option<BTreeMap<&str, &str>> {
        match self.0.get(key)? {
            Value::Map(m) => m
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Some((k.as_str(), s.as_str())),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Canonical JSON serialization: `BTreeMap` already sorts keys, so this
    /// is stable across processes and is what the decomposition cycle guard
    /// hashes (`sha256(name || canonical_json(params))`).
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_narrow_by_variant() {
        let bag = ParamBag::new()
            .with("url", "https://example.com")
            .with("mode", 493_i64)
            .with("strip_dirs", 1_i64)
            .with("deterministic", true);

        assert_eq!(bag.get_str("url"), Some("https://example.com"));
        assert_eq!(bag.get_int("mode"), Some(493));
        assert_eq!(bag.get_bool("deterministic"), Some(true));
        assert_eq!(bag.get_str("mode"), None, "int key must not read as str");
    }

    #[test]
    fn str_list_rejects_mixed_types() {
        let bag = ParamBag::new().with(
            "files",
            Value::List(vec![Value::String("a".into()), Value::Int(1)]),
        );
        assert_eq!(bag.get_str_list("files"), None);

        let bag = ParamBag::new().with("files", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(bag.get_str_list("files"), Some(vec!["a", "b"]));
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let bag = ParamBag::new().with("b", "2").with("a", "1");
        assert_eq!(bag.canonical_json(), r#"{"a":"1","b":"2"}"#);
    }
}
