//! [`Transport`] binding over the blocking `ureq` agent.
//!
//! # Design
//! Each send runs on tokio's blocking pool and reads the whole body before
//! returning. The binding cannot be cancelled: when the timeout race gives
//! up on a send, the blocking task still runs to completion and its result
//! is dropped.
//!
//! Only the redirect option has a ureq equivalent. Cache, credentials and
//! mode are browser concepts and are ignored here.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use ureq::http;

use crate::config::RedirectPolicy;
use crate::error::TransportError;
use crate::http::TransportRequest;
use crate::transport::{Transport, TransportResponse};

/// Blocking `ureq` transport.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    following: ureq::Agent,
    not_following: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status codes are interpreted by the client, never by ureq.
        let following = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        let not_following = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .build()
            .new_agent();
        Self {
            following,
            not_following,
        }
    }

    fn agent(&self, redirect: RedirectPolicy) -> &ureq::Agent {
        match redirect {
            RedirectPolicy::Follow => &self.following,
            RedirectPolicy::Error | RedirectPolicy::Manual => &self.not_following,
        }
    }
}

/// A fully read `ureq` response.
#[derive(Debug, Clone)]
pub struct UreqResponse {
    status: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

#[async_trait]
impl TransportResponse for UreqResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    fn visit_headers(&self, visit: &mut dyn FnMut(&str, &str)) {
        for (name, value) in &self.headers {
            visit(name, value);
        }
    }

    async fn bytes(self) -> Result<Bytes, TransportError> {
        Ok(self.body)
    }
}

#[async_trait]
impl Transport for UreqTransport {
    type Response = UreqResponse;

    async fn send(
        &self,
        request: TransportRequest,
        _cancel: Option<CancellationToken>,
    ) -> Result<UreqResponse, TransportError> {
        let agent = self.agent(request.options.redirect).clone();
        let redirect = request.options.redirect;

        let response = tokio::task::spawn_blocking(move || execute(&agent, request))
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))??;

        if redirect == RedirectPolicy::Error && (300..400).contains(&response.status) {
            return Err(TransportError::InvalidRequest(format!(
                "redirect ({}) not allowed by policy",
                response.status
            )));
        }
        Ok(response)
    }
}

fn execute(agent: &ureq::Agent, request: TransportRequest) -> Result<UreqResponse, TransportError> {
    let mut builder = http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    let result = match request.body {
        Some(body) => agent.run(builder.body(body.to_vec()).map_err(invalid)?),
        None => agent.run(builder.body(()).map_err(invalid)?),
    };
    let mut response = result.map_err(|e| TransportError::Network(Box::new(e)))?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_vec()
        .map_err(|e| TransportError::Network(Box::new(e)))?;

    Ok(UreqResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body: Bytes::from(body),
    })
}

fn invalid(err: http::Error) -> TransportError {
    TransportError::InvalidRequest(err.to_string())
}
