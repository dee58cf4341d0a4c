//! Request and response data types.
//!
//! # Design
//! Requests are plain data: a [`PendingRequest`] is built fresh for every
//! call from the client's stored headers, then turned into a
//! [`TransportRequest`] carrying the final URL. Responses come back as a
//! [`Response`] envelope that is never an `Err`; failures sit in its body.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::config::SendOptions;
use crate::error::RequestError;
use crate::params::Params;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Delete,
    Patch,
    Post,
    Put,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered multimap of request headers with case-insensitive names.
///
/// Names are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((name.to_ascii_lowercase(), value.into()));
    }

    /// Replace every value of `name` with `value`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.append(name, value);
    }

    /// Set `name` only when it is not already present.
    pub fn insert_default(&mut self, name: &str, value: impl Into<String>) {
        if !self.contains(name) {
            self.append(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) {
        let name = name.to_ascii_lowercase();
        self.entries.retain(|(k, _)| *k != name);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Argument to `set_header`: remove the header, or add one or more values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderInput {
    Remove,
    Values(Vec<String>),
}

impl From<&str> for HeaderInput {
    fn from(value: &str) -> Self {
        HeaderInput::Values(vec![value.to_string()])
    }
}

impl From<String> for HeaderInput {
    fn from(value: String) -> Self {
        HeaderInput::Values(vec![value])
    }
}

impl From<Vec<&str>> for HeaderInput {
    fn from(values: Vec<&str>) -> Self {
        HeaderInput::Values(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Option<&str>> for HeaderInput {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(v) => v.into(),
            None => HeaderInput::Remove,
        }
    }
}

/// Request body payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Sent as-is.
    Bytes(Bytes),
    /// Sent as-is.
    Text(String),
    /// Plain object: form-encoded by the core, JSON-encoded by the wrapper.
    Fields(Params),
    /// Structured value: JSON-encoded.
    Json(serde_json::Value),
}

impl Payload {
    /// Serialize `value` into a [`Payload::Json`].
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }
}

impl From<Params> for Payload {
    fn from(params: Params) -> Self {
        Payload::Fields(params)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// Per-call request state. Never shared between calls.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub query: Option<String>,
}

/// The fully resolved request handed to a [`crate::Transport`].
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub options: SendOptions,
}

/// Normalized response headers: `content-type` is stored as `content_type`.
pub type ResponseHeaders = BTreeMap<String, String>;

/// Lowercase a header name and replace `-` with `_`.
pub fn normalize_header_name(name: &str) -> String {
    name.to_ascii_lowercase().replace('-', "_")
}

/// Response envelope body.
#[derive(Debug)]
pub enum Body {
    /// No body was read (HEAD requests, raw-response mode).
    Empty,
    Bytes(Bytes),
    /// Decoded by the JSON wrapper.
    Json(serde_json::Value),
    /// The call failed; see [`RequestError`].
    Error(RequestError),
}

/// The uniform result of every request.
///
/// `code` is `None` only when no response was received; `body` then holds
/// the error. `raw` is set only in raw-response mode and can be consumed
/// once.
#[derive(Debug)]
pub struct Response<R> {
    pub code: Option<u16>,
    pub headers: Option<ResponseHeaders>,
    pub body: Body,
    pub raw: Option<R>,
}

impl<R> Response<R> {
    pub(crate) fn failed(error: impl Into<RequestError>) -> Self {
        Self {
            code: None,
            headers: None,
            body: Body::Error(error.into()),
            raw: None,
        }
    }

    /// A response arrived and its body is not an error.
    pub fn is_ok(&self) -> bool {
        self.code.is_some() && !matches!(self.body, Body::Error(_))
    }

    pub fn error(&self) -> Option<&RequestError> {
        match &self.body {
            Body::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Deserialize a decoded JSON body into `T`.
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.json().map(|v| T::deserialize(v))
    }

    pub fn header(&self, normalized_name: &str) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|h| h.get(normalized_name))
            .map(String::as_str)
    }
}
