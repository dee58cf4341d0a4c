//! The transport core: configuration, request building and the response
//! envelope.
//!
//! # Design
//! `Client` owns the connection config, the stored default headers and the
//! send options. Every call builds its own [`PendingRequest`] from that
//! state, so calls only read shared state and can run concurrently from an
//! `Arc<Client<_>>`. Mutation (`set_url`, `set_header`, ...) needs `&mut self`.
//!
//! `request` and the verb helpers never fail: transport errors, timeouts and
//! non-ok statuses all come back inside the [`Response`] envelope. Only URL
//! configuration returns `Err`.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

use crate::config::{ClientConfig, ClientOptions, SendOptions, DEFAULT_COMPATIBLE_SCHEMES};
use crate::error::{ConfigError, HttpStatusError, RequestError, TransportError};
use crate::http::{
    normalize_header_name, Body, HeaderInput, Headers, HttpMethod, Payload, PendingRequest,
    Response, ResponseHeaders, TransportRequest,
};
use crate::params::{build_request_parameters, verb_query, Params, Query};
use crate::transport::{fetch_with_timeout, Timer, TokioTimer, Transport, TransportResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP client over an injected [`Transport`].
pub struct Client<T: Transport> {
    transport: T,
    timer: Box<dyn Timer>,
    url: String,
    config: ClientConfig,
    compatible_schemes: &'static [&'static str],
    headers: Headers,
    send_options: SendOptions,
    timeout: Duration,
    return_raw_response: bool,
}

impl<T: Transport> Client<T> {
    pub const COMPATIBLE_SCHEMES: &'static [&'static str] = DEFAULT_COMPATIBLE_SCHEMES;

    /// Create a client for `url`. A zero `timeout` disables the timeout race.
    pub fn new(transport: T, url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Self::with_options(transport, url, ClientOptions::with_timeout(timeout))
    }

    pub fn with_options(
        transport: T,
        url: &str,
        options: ClientOptions,
    ) -> Result<Self, ConfigError> {
        Self::build(transport, url, options, Self::COMPATIBLE_SCHEMES)
    }

    pub(crate) fn build(
        transport: T,
        url: &str,
        options: ClientOptions,
        compatible_schemes: &'static [&'static str],
    ) -> Result<Self, ConfigError> {
        let config = ClientConfig::parse(url, compatible_schemes)?;
        Ok(Self {
            transport,
            timer: Box::new(TokioTimer),
            url: url.to_string(),
            config,
            compatible_schemes,
            headers: Headers::new(),
            send_options: options.send,
            timeout: options.timeout(),
            return_raw_response: options.return_raw_response,
        })
    }

    /// Replace the timer used by the timeout race.
    pub fn with_timer(mut self, timer: impl Timer + 'static) -> Self {
        self.timer = Box::new(timer);
        self
    }

    /// Restrict or widen the accepted schemes. The current URL is checked
    /// again against the new set.
    pub fn with_compatible_schemes(
        mut self,
        schemes: &'static [&'static str],
    ) -> Result<Self, ConfigError> {
        self.config = ClientConfig::parse(&self.url, schemes)?;
        self.compatible_schemes = schemes;
        Ok(self)
    }

    pub fn compatible_schemes(&self) -> &'static [&'static str] {
        self.compatible_schemes
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Point the client at a new URL.
    ///
    /// Stored headers and send options are kept. Credentials are taken from
    /// the new URL's userinfo, so any set with `set_basic_auth` are dropped.
    /// On error the client is left unchanged.
    pub fn set_url(&mut self, url: &str) -> Result<(), ConfigError> {
        self.config = ClientConfig::parse(url, self.compatible_schemes)?;
        self.url = url.to_string();
        tracing::debug!(url = %self.config.base_url(), "client reconfigured");
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn return_raw_response(&self) -> bool {
        self.return_raw_response
    }

    /// When on, successful responses carry the unread transport response in
    /// `Response::raw` instead of a body.
    pub fn set_return_raw_response(&mut self, raw: bool) {
        self.return_raw_response = raw;
    }

    pub fn send_options(&self) -> &SendOptions {
        &self.send_options
    }

    pub fn set_send_options(&mut self, options: SendOptions) {
        self.send_options = options;
    }

    pub fn set_basic_auth(&mut self, username: &str, password: &str) {
        self.config.auth_username = Some(username.to_string());
        self.config.auth_password = Some(password.to_string());
    }

    pub fn clear_basic_auth(&mut self) {
        self.config.auth_username = None;
        self.config.auth_password = None;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Add, append or remove a stored header.
    ///
    /// `HeaderInput::Remove` deletes every value of `name`. Otherwise the
    /// values are added when `name` is absent or `append` is true; an
    /// existing header is never overwritten.
    pub fn set_header(&mut self, name: &str, value: impl Into<HeaderInput>, append: bool) {
        match value.into() {
            HeaderInput::Remove => self.headers.remove(name),
            HeaderInput::Values(values) => {
                if append || !self.headers.contains(name) {
                    for value in values {
                        self.headers.append(name, value);
                    }
                }
            }
        }
    }

    /// Drop every stored header. Other settings are kept.
    pub fn reset_headers(&mut self) {
        self.headers = Headers::new();
    }

    pub fn build_request_parameters(&self, query: &Query, separator: &str) -> String {
        build_request_parameters(query, separator)
    }

    /// Issue a request. Never fails; see [`Response`].
    ///
    /// A `Query::Params` is joined with `separator`; a `Query::Literal` is
    /// attached verbatim. `Payload::Fields` is form-encoded.
    pub async fn request(
        &self,
        method: HttpMethod,
        separator: &str,
        query: Option<Query>,
        payload: Option<Payload>,
    ) -> Response<T::Response> {
        match self.pending_request(method, separator, query, payload) {
            Ok(pending) => self.dispatch(pending, self.return_raw_response).await,
            Err(e) => {
                tracing::warn!(%method, error = %e, "request could not be built");
                Response::failed(e)
            }
        }
    }

    /// Build the per-call request: query string, body and auth header.
    pub(crate) fn pending_request(
        &self,
        method: HttpMethod,
        separator: &str,
        query: Option<Query>,
        payload: Option<Payload>,
    ) -> Result<PendingRequest, TransportError> {
        let mut headers = self.headers.clone();

        let query = query
            .map(|q| build_request_parameters(&q, separator))
            .filter(|q| !q.is_empty());

        let body = match payload {
            None => None,
            Some(Payload::Bytes(bytes)) => Some(bytes),
            Some(Payload::Text(text)) => Some(Bytes::from(text)),
            Some(Payload::Fields(fields)) => {
                headers.insert_default("content-type", FORM_CONTENT_TYPE);
                let body = build_request_parameters(&Query::Params(fields), "&");
                Some(Bytes::from(body))
            }
            Some(Payload::Json(value)) => {
                headers.insert_default("content-type", JSON_CONTENT_TYPE);
                let encoded = serde_json::to_vec(&value)
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                Some(Bytes::from(encoded))
            }
        };

        if self.config.has_basic_auth() {
            headers.insert("authorization", self.basic_auth_header());
        }

        Ok(PendingRequest {
            method,
            headers,
            body,
            query,
        })
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!(
            "{}:{}",
            self.config.auth_username.as_deref().unwrap_or_default(),
            self.config.auth_password.as_deref().unwrap_or_default()
        );
        format!("Basic {}", STANDARD.encode(credentials))
    }

    /// Send `pending` and fold any transport error into the envelope.
    pub(crate) async fn dispatch(
        &self,
        pending: PendingRequest,
        raw_response: bool,
    ) -> Response<T::Response> {
        let method = pending.method;
        match self.send_request(pending, raw_response).await {
            Ok(response) => response,
            Err(e) => {
                let url = self.config.base_url();
                tracing::warn!(%method, %url, error = %e, "request failed");
                Response::failed(e)
            }
        }
    }

    async fn send_request(
        &self,
        pending: PendingRequest,
        raw_response: bool,
    ) -> Result<Response<T::Response>, TransportError> {
        let method = pending.method;
        let url = self.target_url(pending.query.as_deref());
        tracing::debug!(%method, %url, "sending request");

        let request = TransportRequest {
            method,
            url,
            headers: pending.headers,
            body: pending.body,
            options: self.send_options,
        };

        let raw = if self.timeout.is_zero() {
            self.transport.send(request, None).await?
        } else {
            fetch_with_timeout(&self.transport, self.timer.as_ref(), request, self.timeout).await?
        };

        self.envelope(method, raw, raw_response).await
    }

    fn target_url(&self, query: Option<&str>) -> String {
        let base = self.config.base_url();
        match query {
            Some(q) if q.starts_with('?') => format!("{base}{q}"),
            Some(q) => format!("{base}?{q}"),
            None => base,
        }
    }

    async fn envelope(
        &self,
        method: HttpMethod,
        raw: T::Response,
        raw_response: bool,
    ) -> Result<Response<T::Response>, TransportError> {
        let code = raw.status();
        let headers = collect_headers(&raw);
        tracing::debug!(%method, status = code, "response received");

        let (body, raw) = if !raw.ok() {
            let error = HttpStatusError {
                status: code,
                status_text: raw.status_text().to_string(),
            };
            (Body::Error(RequestError::Status(error)), None)
        } else if method == HttpMethod::Head {
            (Body::Empty, None)
        } else if raw_response {
            (Body::Empty, Some(raw))
        } else {
            (Body::Bytes(raw.bytes().await?), None)
        };

        Ok(Response {
            code: Some(code),
            headers: Some(headers),
            body,
            raw,
        })
    }

    pub async fn request_get(&self, params: Params) -> Response<T::Response> {
        self.request(HttpMethod::Get, "&", verb_query(params), None).await
    }

    pub async fn request_head(&self, params: Params) -> Response<T::Response> {
        self.request(HttpMethod::Head, "&", verb_query(params), None).await
    }

    pub async fn request_delete(&self, params: Params) -> Response<T::Response> {
        self.request(HttpMethod::Delete, "&", verb_query(params), None).await
    }

    pub async fn request_options(&self, params: Params) -> Response<T::Response> {
        self.request(HttpMethod::Options, "&", verb_query(params), None).await
    }

    pub async fn request_trace(&self, params: Params) -> Response<T::Response> {
        self.request(HttpMethod::Trace, "&", verb_query(params), None).await
    }

    pub async fn request_patch(
        &self,
        payload: Option<Payload>,
        params: Params,
    ) -> Response<T::Response> {
        self.request(HttpMethod::Patch, "&", verb_query(params), payload).await
    }

    pub async fn request_post(
        &self,
        payload: Option<Payload>,
        params: Params,
    ) -> Response<T::Response> {
        self.request(HttpMethod::Post, "&", verb_query(params), payload).await
    }

    pub async fn request_put(
        &self,
        payload: Option<Payload>,
        params: Params,
    ) -> Response<T::Response> {
        self.request(HttpMethod::Put, "&", verb_query(params), payload).await
    }
}

/// Normalize response headers; repeated names are joined with `", "`.
fn collect_headers<R: TransportResponse>(raw: &R) -> ResponseHeaders {
    let mut headers = ResponseHeaders::new();
    raw.visit_headers(&mut |name, value| {
        headers
            .entry(normalize_header_name(name))
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    });
    headers
}
