//! In-process fake transport for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::http::TransportRequest;
use crate::transport::{Transport, TransportResponse};

#[derive(Debug, Clone)]
pub(crate) struct FakeResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub body_fails: bool,
}

impl FakeResponse {
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            status_text: reason(status).to_string(),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Bytes::copy_from_slice(body.as_bytes()),
            body_fails: false,
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::text(status, body).with_content_type("application/json")
    }

    pub fn with_content_type(mut self, value: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        self.headers.push(("Content-Type".to_string(), value.to_string()));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_failing_body(mut self) -> Self {
        self.body_fails = true;
        self
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        302 => "Found",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[async_trait]
impl TransportResponse for FakeResponse {
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
        if self.body_fails {
            return Err(TransportError::Network(Box::new(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-body",
            ))));
        }
        Ok(self.body)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FakeReply {
    Now(FakeResponse),
    After(Duration, FakeResponse),
    Hang,
    Refused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cancellation {
    Unsupported,
    Honour,
    Ignore,
}

/// Records every request and answers with the configured reply.
#[derive(Debug)]
pub(crate) struct FakeTransport {
    reply: FakeReply,
    cancellation: Cancellation,
    sent: Mutex<Vec<TransportRequest>>,
    cancelled: AtomicUsize,
}

impl FakeTransport {
    pub fn new(reply: FakeReply) -> Self {
        Self {
            reply,
            cancellation: Cancellation::Unsupported,
            sent: Mutex::new(Vec::new()),
            cancelled: AtomicUsize::new(0),
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::new(FakeReply::Now(FakeResponse::text(200, body)))
    }

    pub fn replying(response: FakeResponse) -> Self {
        Self::new(FakeReply::Now(response))
    }

    pub fn cancellable(mut self) -> Self {
        self.cancellation = Cancellation::Honour;
        self
    }

    /// Claims cancellation support but never looks at the token.
    pub fn cancellable_ignoring_token(mut self) -> Self {
        self.cancellation = Cancellation::Ignore;
        self
    }

    pub fn sent(&self) -> Vec<TransportRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_sent(&self) -> TransportRequest {
        self.sent().pop().expect("no request was sent")
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Response = FakeResponse;

    fn supports_cancellation(&self) -> bool {
        self.cancellation != Cancellation::Unsupported
    }

    async fn send(
        &self,
        request: TransportRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<FakeResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        let reply = self.reply.clone();
        let work = async move {
            match reply {
                FakeReply::Now(response) => Ok(response),
                FakeReply::After(delay, response) => {
                    tokio::time::sleep(delay).await;
                    Ok(response)
                }
                FakeReply::Hang => std::future::pending().await,
                FakeReply::Refused => Err(refused()),
            }
        };

        match (self.cancellation, cancel) {
            (Cancellation::Honour, Some(token)) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        self.cancelled.fetch_add(1, Ordering::SeqCst);
                        Err(TransportError::Aborted)
                    }
                    result = work => result,
                }
            }
            _ => work.await,
        }
    }
}

fn refused() -> TransportError {
    let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    TransportError::Network(Box::new(err))
}
