//! Stream tee for server-sent event responses.
//!
//! [`TeeBody`] wraps the upstream body. Every data frame is handed to the
//! client in the same poll that produced it; a refcounted handle to the same
//! bytes is appended to a [`StreamAccumulator`]. When the upstream signals
//! end-of-data the accumulated copy is decoded, escaped and emitted as one
//! `api_response` event.
//!
//! ```text
//! Streaming ──(end of data)──▶ Flushing ──▶ Done
//!     │                            └──(emit failed)──▶ Error
//!     └──(upstream error)──▶ Error
//! ```
//!
//! If the body is dropped while still `Streaming` (client went away) the
//! copy is discarded and no `api_response` is written.

use std::mem;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::http::Response;
use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};

use crate::capture::accumulator::StreamAccumulator;
use crate::capture::{
    complete_prefix, escape_newlines, CaptureContext, CaptureError, ResponseMeta,
};
use crate::observability::events::{ApiResponseEvent, LogEvent, SseLoggingErrorEvent};
use crate::observability::{emit_or_warn, metrics};

/// Lifecycle of one tee.
#[derive(Debug)]
pub enum TeeState {
    Streaming(StreamAccumulator),
    Flushing,
    Done,
    Error,
}

/// Body adapter that forwards upstream frames and logs the whole stream once.
pub struct TeeBody<B> {
    inner: B,
    state: TeeState,
    meta: ResponseMeta,
    capture: CaptureContext,
}

/// Replace the body of an upstream response with a tee.
///
/// Returns immediately; logging happens as the client consumes the body.
pub fn tee_response<B>(response: Response<B>, capture: CaptureContext) -> Response<TeeBody<B>> {
    let meta = ResponseMeta::of(&response);
    response.map(|body| TeeBody::new(body, meta, capture))
}

impl<B> TeeBody<B> {
    pub fn new(inner: B, meta: ResponseMeta, capture: CaptureContext) -> Self {
        let state = TeeState::Streaming(StreamAccumulator::new(capture.max_logged_bytes));
        Self {
            inner,
            state,
            meta,
            capture,
        }
    }

    pub fn state(&self) -> &TeeState {
        &self.state
    }

    /// End of data: build and emit the consolidated event.
    fn finish(&mut self) {
        let accumulator = match mem::replace(&mut self.state, TeeState::Flushing) {
            TeeState::Streaming(accumulator) => accumulator,
            other => {
                self.state = other;
                return;
            }
        };

        match self.flush(accumulator) {
            Ok(()) => {
                self.state = TeeState::Done;
                metrics::record_stream("completed");
            }
            Err(e) => {
                self.state = TeeState::Error;
                metrics::record_stream("log_failed");
                self.report(&e);
            }
        }
    }

    fn flush(&self, accumulator: StreamAccumulator) -> Result<(), CaptureError> {
        let captured = accumulator.finish();
        let retained = if captured.truncated {
            complete_prefix(&captured.bytes)
        } else {
            &captured.bytes[..]
        };
        let text = String::from_utf8_lossy(retained);

        let event = LogEvent::ApiResponse(ApiResponseEvent {
            request_id: self.capture.correlation.id(),
            status: self.meta.status,
            status_text: self.meta.status_text.clone(),
            duration: self.capture.correlation.elapsed_ms(),
            endpoint: self.capture.endpoint.clone(),
            response_body: escape_newlines(&text),
            response_size: captured.total_bytes,
            is_sse: true,
            stream_completed: Some(true),
            truncated: captured.truncated,
            response_headers: self.meta.headers.clone(),
        });

        self.capture.sink.emit(event)?;
        Ok(())
    }

    /// Upstream failed mid-stream: drop the copy and record why.
    fn abort(&mut self, reason: String) {
        if let TeeState::Streaming(accumulator) = mem::replace(&mut self.state, TeeState::Error) {
            metrics::record_stream("aborted");
            self.report(&CaptureError::UpstreamAborted {
                bytes: accumulator.total_bytes(),
                reason,
            });
        }
    }

    fn report(&self, error: &CaptureError) {
        tracing::warn!(
            request_id = %self.capture.correlation.id(),
            endpoint = %self.capture.endpoint,
            error = %error,
            "Streamed response not logged"
        );
        emit_or_warn(
            self.capture.sink.as_ref(),
            LogEvent::SseLoggingError(SseLoggingErrorEvent {
                request_id: self.capture.correlation.id(),
                error: error.to_string(),
                endpoint: self.capture.endpoint.clone(),
            }),
        );
    }
}

impl<B> Body for TeeBody<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if !matches!(this.state, TeeState::Streaming(_)) {
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let (Some(data), TeeState::Streaming(accumulator)) =
                    (frame.data_ref(), &mut this.state)
                {
                    accumulator.push(data);
                }
                if this.inner.is_end_stream() {
                    this.finish();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                this.abort(e.to_string());
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.finish();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.state, TeeState::Done | TeeState::Error)
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for TeeBody<B> {
    fn drop(&mut self) {
        if matches!(self.state, TeeState::Streaming(_)) {
            tracing::debug!(
                request_id = %self.capture.correlation.id(),
                endpoint = %self.capture.endpoint,
                "Client disconnected before end of stream, response log skipped"
            );
            metrics::record_stream("disconnected");
        }
    }
}
