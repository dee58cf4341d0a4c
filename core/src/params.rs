//! Query-string and form-field building.
//!
//! # Design
//! `Params` keeps insertion order so the rendered string is deterministic.
//! Values are percent-encoded with the `application/x-www-form-urlencoded`
//! rules (space becomes `+`); booleans render as `1` / `0`.

use serde::ser::{Serialize, SerializeMap, Serializer};
use url::form_urlencoded::byte_serialize;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    fn render(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Float(n) => n.to_string(),
            ParamValue::Bool(true) => "1".to_string(),
            ParamValue::Bool(false) => "0".to_string(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Str(s) => serializer.serialize_str(s),
            ParamValue::Int(n) => serializer.serialize_i64(*n),
            ParamValue::Float(n) => serializer.serialize_f64(*n),
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

/// Ordered key/value mapping used for query strings and form bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Serialized as a JSON object in insertion order.
impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Query input: either a pre-built string or a mapping to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Attached verbatim.
    Literal(String),
    Params(Params),
}

impl From<Params> for Query {
    fn from(params: Params) -> Self {
        Query::Params(params)
    }
}

impl From<&str> for Query {
    fn from(literal: &str) -> Self {
        Query::Literal(literal.to_string())
    }
}

impl From<String> for Query {
    fn from(literal: String) -> Self {
        Query::Literal(literal)
    }
}

/// Render `query` as `key=value` pairs joined by `separator`.
///
/// A `Query::Literal` is returned unchanged.
pub fn build_request_parameters(query: &Query, separator: &str) -> String {
    match query {
        Query::Literal(s) => s.clone(),
        Query::Params(params) => params
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(&v.render())))
            .collect::<Vec<_>>()
            .join(separator),
    }
}

/// Query for the verb helpers: `&`-joined, or none when `params` is empty.
pub(crate) fn verb_query(params: Params) -> Option<Query> {
    if params.is_empty() {
        return None;
    }
    let query = build_request_parameters(&params.into(), "&");
    Some(Query::Literal(query))
}

fn encode(s: &str) -> String {
    byte_serialize(s.as_bytes()).collect()
}
