//! Thin async HTTP client core over an injected transport.
//!
//! # Overview
//! [`Client`] parses and validates a base URL, builds query strings and
//! bodies, injects basic auth, races each send against a timeout and folds
//! the outcome into a uniform [`Response`] envelope. [`JsonClient`] layers
//! JSON encoding of object payloads and decoding of JSON responses on top.
//!
//! # Design
//! - The network send is a [`Transport`] capability passed in at
//!   construction; [`UreqTransport`] is the bundled binding.
//! - The timeout sleep is a [`Timer`] capability, [`TokioTimer`] by default.
//! - Three error channels, kept separate:
//!   [`ConfigError`] is returned from construction and `set_url`;
//!   transport and status failures are data inside [`Body::Error`];
//!   [`DecodeError`] is returned by [`JsonClient`] for malformed JSON.

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod json;
pub mod params;
pub mod transport;

#[cfg(test)]
mod testing;

pub use blocking::{UreqResponse, UreqTransport};
pub use client::Client;
pub use config::{
    CacheMode, ClientConfig, ClientOptions, CredentialsMode, RedirectPolicy, RequestMode,
    SendOptions,
};
pub use error::{ConfigError, DecodeError, HttpStatusError, RequestError, TransportError};
pub use http::{Body, HeaderInput, Headers, HttpMethod, Payload, Response, ResponseHeaders};
pub use json::JsonClient;
pub use params::{build_request_parameters, ParamValue, Params, Query};
pub use transport::{fetch_with_timeout, Timer, TokioTimer, Transport, TransportResponse};
