//! Transport and timer capabilities, and the timeout race.
//!
//! # Design
//! The client never touches the network itself. A [`Transport`] binding
//! performs the send and exposes the response through [`TransportResponse`];
//! a [`Timer`] supplies the sleep used by the timeout race. Both are
//! injected at construction, so tests can swap in fakes and a paused clock.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::http::TransportRequest;

/// The platform send primitive.
#[async_trait]
pub trait Transport: Send + Sync {
    type Response: TransportResponse;

    /// Whether `send` honours the cancellation token it is given.
    ///
    /// When `true`, a timed-out send has its token cancelled and is polled
    /// once more so it can report its own error; after that it is dropped.
    fn supports_cancellation(&self) -> bool {
        false
    }

    /// Send `request`. `cancel` is `Some` only when the transport supports
    /// cancellation and a timeout is armed.
    async fn send(
        &self,
        request: TransportRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<Self::Response, TransportError>;
}

/// A received response whose body has not been read yet.
#[async_trait]
pub trait TransportResponse: Send + Sized + 'static {
    fn status(&self) -> u16;

    fn status_text(&self) -> &str;

    /// 2xx and 3xx count as ok.
    fn ok(&self) -> bool {
        (200..400).contains(&self.status())
    }

    /// Call `visit` once per header value, in the order received.
    fn visit_headers(&self, visit: &mut dyn FnMut(&str, &str));

    /// Read the whole body. Consumes the response.
    async fn bytes(self) -> Result<Bytes, TransportError>;
}

pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Single-fire timer. Dropping the returned future cancels it.
pub trait Timer: Send + Sync {
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// [`Timer`] backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Race `transport.send(request)` against `timer.sleep(timeout)`.
///
/// With a cancellable transport the timer cancels the token and polls the
/// send once more: an error it reports right away is returned, anything else
/// is dropped and the race resolves to [`TransportError::Aborted`]. Otherwise the race resolves to
/// [`TransportError::Timeout`] and the send future is dropped unpolled; a
/// binding that runs its I/O elsewhere may still finish it in the
/// background, and that result is discarded.
///
/// If the send wins, the timer is dropped before returning.
pub async fn fetch_with_timeout<T: Transport + ?Sized>(
    transport: &T,
    timer: &dyn Timer,
    request: TransportRequest,
    timeout: Duration,
) -> Result<T::Response, TransportError> {
    if transport.supports_cancellation() {
        let token = CancellationToken::new();
        let mut send = transport.send(request, Some(token.clone()));
        let sleep = timer.sleep(timeout);

        tokio::select! {
            biased;
            result = &mut send => result,
            () = sleep => {
                tracing::warn!(?timeout, "request timed out, cancelling send");
                token.cancel();
                tokio::select! {
                    biased;
                    result = &mut send => match result {
                        Ok(_) => Err(TransportError::Aborted),
                        Err(e) => Err(e),
                    },
                    () = std::future::ready(()) => Err(TransportError::Aborted),
                }
            }
        }
    } else {
        let send = transport.send(request, None);
        let sleep = timer.sleep(timeout);

        tokio::select! {
            biased;
            result = send => result,
            () = sleep => {
                tracing::warn!(?timeout, "request timed out, abandoning send");
                Err(TransportError::Timeout(timeout))
            }
        }
    }
}
