//! JSON content negotiation on top of [`Client`].
//!
//! # Design
//! `JsonClient` always dispatches in raw-response mode so it can look at
//! `content-type` before the body is read. A JSON response is decoded into
//! `Body::Json`; anything else is read into `Body::Bytes`, so the raw handle
//! is consumed either way and `Response::raw` is always `None`.
//!
//! A malformed JSON body is the one failure that is returned as `Err`
//! ([`DecodeError`]) rather than folded into the envelope.

use std::time::Duration;

use crate::client::Client;
use crate::config::{ClientOptions, DEFAULT_COMPATIBLE_SCHEMES};
use crate::error::{ConfigError, DecodeError, TransportError};
use crate::http::{Body, HeaderInput, HttpMethod, Payload, Response};
use crate::params::{verb_query, Params, Query};
use crate::transport::{Transport, TransportResponse};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Whether a `content-type` value is `application/json`, optionally
/// followed by `;` parameters.
pub fn is_json_content_type(value: &str) -> bool {
    let mime = value.split(';').next().unwrap_or_default();
    mime.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE)
}

/// Character set of the process locale, from `LC_ALL`, `LC_CTYPE` or `LANG`.
pub fn detect_charset() -> Option<String> {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .and_then(|locale| charset_from_locale(&locale))
}

/// `en_US.UTF-8@euro` -> `utf-8`. Locales without a codeset give `None`.
pub fn charset_from_locale(locale: &str) -> Option<String> {
    let (_, codeset) = locale.split_once('.')?;
    let codeset = codeset.split('@').next().unwrap_or_default().trim();
    if codeset.is_empty() {
        return None;
    }
    let codeset = codeset.to_ascii_lowercase();
    Some(match codeset.as_str() {
        "utf8" => "utf-8".to_string(),
        _ => codeset,
    })
}

/// [`Client`] that JSON-encodes object payloads and decodes JSON responses.
pub struct JsonClient<T: Transport> {
    inner: Client<T>,
    charset: Option<String>,
}

impl<T: Transport> JsonClient<T> {
    pub const COMPATIBLE_SCHEMES: &'static [&'static str] = DEFAULT_COMPATIBLE_SCHEMES;

    pub fn new(transport: T, url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Self::with_options(transport, url, ClientOptions::with_timeout(timeout))
    }

    /// `options.return_raw_response` is ignored; the wrapper manages it.
    pub fn with_options(
        transport: T,
        url: &str,
        options: ClientOptions,
    ) -> Result<Self, ConfigError> {
        let inner = Client::build(transport, url, options, Self::COMPATIBLE_SCHEMES)?;
        Ok(Self {
            inner,
            charset: detect_charset(),
        })
    }

    /// Override the charset advertised in the default `content-type`.
    pub fn with_charset(mut self, charset: Option<&str>) -> Self {
        self.charset = charset.map(str::to_string);
        self
    }

    pub fn client(&self) -> &Client<T> {
        &self.inner
    }

    pub fn client_mut(&mut self) -> &mut Client<T> {
        &mut self.inner
    }

    pub fn url(&self) -> &str {
        self.inner.url()
    }

    pub fn set_url(&mut self, url: &str) -> Result<(), ConfigError> {
        self.inner.set_url(url)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<HeaderInput>, append: bool) {
        self.inner.set_header(name, value, append);
    }

    pub fn reset_headers(&mut self) {
        self.inner.reset_headers();
    }

    pub fn set_basic_auth(&mut self, username: &str, password: &str) {
        self.inner.set_basic_auth(username, password);
    }

    fn content_type(&self) -> String {
        match &self.charset {
            Some(charset) => format!("{JSON_CONTENT_TYPE}; charset={charset}"),
            None => JSON_CONTENT_TYPE.to_string(),
        }
    }

    /// Issue a request with JSON negotiation.
    ///
    /// `Payload::Fields` and `Payload::Json` are sent as JSON text with
    /// `accept` and `content-type` defaulted to `application/json`. Every
    /// failure except a malformed JSON body is reported inside the envelope.
    pub async fn request(
        &self,
        method: HttpMethod,
        separator: &str,
        query: Option<Query>,
        payload: Option<Payload>,
    ) -> Result<Response<T::Response>, DecodeError> {
        let (payload, is_object) = match payload {
            Some(Payload::Fields(fields)) => (Some(encode(&fields)), true),
            Some(Payload::Json(value)) => (Some(encode(&value)), true),
            other => (other.map(Ok), false),
        };
        let payload = match payload.transpose() {
            Ok(payload) => payload,
            Err(e) => return Ok(Response::failed(e)),
        };

        let mut pending = match self.inner.pending_request(method, separator, query, payload) {
            Ok(pending) => pending,
            Err(e) => return Ok(Response::failed(e)),
        };
        if is_object {
            let headers = &mut pending.headers;
            headers.insert_default("accept", JSON_CONTENT_TYPE);
            headers.insert_default("content-type", self.content_type());
        }

        let response = self.inner.dispatch(pending, true).await;
        negotiate(response).await
    }

    pub async fn request_get(&self, params: Params) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Get, "&", verb_query(params), None).await
    }

    pub async fn request_head(&self, params: Params) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Head, "&", verb_query(params), None).await
    }

    pub async fn request_delete(
        &self,
        params: Params,
    ) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Delete, "&", verb_query(params), None).await
    }

    pub async fn request_options(
        &self,
        params: Params,
    ) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Options, "&", verb_query(params), None).await
    }

    pub async fn request_trace(
        &self,
        params: Params,
    ) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Trace, "&", verb_query(params), None).await
    }

    pub async fn request_patch(
        &self,
        payload: Option<Payload>,
        params: Params,
    ) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Patch, "&", verb_query(params), payload).await
    }

    pub async fn request_post(
        &self,
        payload: Option<Payload>,
        params: Params,
    ) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Post, "&", verb_query(params), payload).await
    }

    pub async fn request_put(
        &self,
        payload: Option<Payload>,
        params: Params,
    ) -> Result<Response<T::Response>, DecodeError> {
        self.request(HttpMethod::Put, "&", verb_query(params), payload).await
    }
}

fn encode<S: serde::Serialize>(value: &S) -> Result<Payload, TransportError> {
    serde_json::to_string(value)
        .map(Payload::Text)
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

/// Consume the raw handle: decode JSON, otherwise keep the bytes.
async fn negotiate<R: TransportResponse>(
    mut response: Response<R>,
) -> Result<Response<R>, DecodeError> {
    let Some(raw) = response.raw.take() else {
        return Ok(response);
    };
    let is_json = response
        .header("content_type")
        .is_some_and(is_json_content_type);

    let body = match raw.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read response body");
            return Ok(Response::failed(e));
        }
    };

    response.body = if !is_json {
        Body::Bytes(body)
    } else if body.is_empty() {
        Body::Empty
    } else {
        tracing::debug!(len = body.len(), "decoding JSON response");
        Body::Json(serde_json::from_slice(&body)?)
    };
    Ok(response)
}
