//! # Form Input
//!
//! The untrusted, flat key/value payload every action accepts. It arrives
//! either URL-encoded (every value is text) or as a JSON object (values may
//! be booleans, numbers or string arrays).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Bool(bool),
    Number(f64),
    List(Vec<String>),
    Text(String),
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for FormValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<String>> for FormValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, FormValue>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and internal callers.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FormValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&FormValue> {
        self.0.get(field)
    }

    /// Text value of `field`. Non-text values are not coerced.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.0.get(field) {
            Some(FormValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Boolean value of `field`. Checkbox-style text (`on`, `true`, `1`) counts
    /// as true, `off`/`false`/`0`/empty as false; any other text is `None`.
    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.0.get(field)? {
            FormValue::Bool(b) => Some(*b),
            FormValue::Text(s) => match s.trim() {
                "true" | "on" | "1" => Some(true),
                "false" | "off" | "0" | "" => Some(false),
                _ => None,
            },
            FormValue::Number(_) | FormValue::List(_) => None,
        }
    }

    /// Numeric value of `field`; text is parsed.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            FormValue::Number(n) => Some(*n),
            FormValue::Text(s) => s.trim().parse().ok(),
            FormValue::Bool(_) | FormValue::List(_) => None,
        }
    }

    /// List value of `field`; text is split on commas, blanks dropped.
    pub fn list(&self, field: &str) -> Vec<String> {
        match self.0.get(field) {
            Some(FormValue::List(items)) => items.clone(),
            Some(FormValue::Text(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<FormValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
