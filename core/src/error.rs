//! Error types for the fetchkit client.
//!
//! # Design
//! The three failure families are kept apart on purpose and surface through
//! three different channels:
//!
//! - [`ConfigError`] is returned as `Err` from construction and `set_url`.
//! - [`TransportError`] and [`HttpStatusError`] never escape `request`; they
//!   are stored as data in [`crate::Body::Error`] via [`RequestError`].
//! - [`DecodeError`] is the JSON wrapper's only `Err` path.

use std::time::Duration;

use thiserror::Error;

/// The configured URL cannot be used by this client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// URL could not be parsed.
    #[error("invalid URL '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// URL scheme is outside the client's compatible set.
    #[error("URL scheme '{scheme}' not supported (expected one of: {})", allowed.join(", "))]
    UnsupportedScheme {
        scheme: String,
        allowed: Vec<String>,
    },

    /// URL has no host component.
    #[error("URL '{url}' has no host")]
    MissingHost { url: String },
}

/// The request never produced a response.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// The timer won the race and the transport could not be cancelled.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The in-flight send was cancelled.
    #[error("request aborted")]
    Aborted,

    /// Network or protocol failure reported by the transport.
    #[error("transport error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The transport rejected the request before sending it.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A completed response whose status is not ok.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status} {status_text}")]
pub struct HttpStatusError {
    pub status: u16,
    pub status_text: String,
}

/// The error value carried inside a response envelope body.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Status(#[from] HttpStatusError),
}

impl RequestError {
    /// Whether this error came from the timeout race.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RequestError::Transport(TransportError::Timeout(_) | TransportError::Aborted)
        )
    }
}

/// A response claimed to be JSON but its body did not parse.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
