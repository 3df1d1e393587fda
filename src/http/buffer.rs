//! Response body buffering.
//!
//! # Responsibilities
//! - Capture a streamed response body into a replayable buffer
//! - Rewrite headers for re-streaming (`chunked_headers`)
//! - Free captured chunks exactly once on every exit path
//!
//! # Design Decisions
//! - A buffer exists only while capturing; `finalize` and `release` consume it
//! - Dropping a buffer mid-capture (request cancelled, future dropped) runs
//!   the release path from `Drop`
//! - Capture races the body stream against a `CancellationToken`

use axum::http::{header, HeaderMap, HeaderValue};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;

/// Live accounting for buffers sharing a tracker.
#[derive(Debug, Default)]
pub struct BufferTracker {
    live_chunks: AtomicUsize,
    live_bytes: AtomicUsize,
    finalized: AtomicU64,
    released: AtomicU64,
}

impl BufferTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Chunks currently held by open buffers.
    pub fn live_chunks(&self) -> usize {
        self.live_chunks.load(Ordering::Acquire)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Acquire)
    }

    /// Buffers that ended by handing their body on.
    pub fn finalized(&self) -> u64 {
        self.finalized.load(Ordering::Acquire)
    }

    /// Buffers that ended by discarding their body (error or cancellation).
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Acquire)
    }
}

/// A captured response: headers plus the whole body.
#[derive(Debug, Clone)]
pub struct CapturedBody {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// An in-progress body capture owned by one request flow.
#[derive(Debug)]
pub struct ResponseBuffer {
    headers: HeaderMap,
    chunks: Vec<Bytes>,
    len: usize,
    capturing: bool,
    tracker: Option<Arc<BufferTracker>>,
}

impl ResponseBuffer {
    /// Start capturing. The header copy drops `content-length`, which no longer
    /// holds once the body may be rewritten.
    pub fn begin_capture(headers: &HeaderMap) -> Self {
        let mut headers = headers.clone();
        headers.remove(header::CONTENT_LENGTH);

        Self {
            headers,
            chunks: Vec::new(),
            len: 0,
            capturing: true,
            tracker: None,
        }
    }

    /// Report chunk accounting to `tracker`.
    pub fn with_tracker(mut self, tracker: Arc<BufferTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn append_chunk(&mut self, chunk: Bytes) {
        let size = chunk.len();
        self.len += size;
        self.chunks.push(chunk);

        if let Some(tracker) = &self.tracker {
            tracker.live_chunks.fetch_add(1, Ordering::AcqRel);
            tracker.live_bytes.fetch_add(size, Ordering::AcqRel);
        }
        metrics::record_buffer_retained(size);
    }

    /// Bytes captured so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Join the captured chunks into one body.
    pub fn finalize(self) -> CapturedBody {
        self.finish("finalized")
    }

    /// Discard the captured chunks and hand back `error` untouched.
    pub fn release<E>(mut self, error: E) -> E {
        self.discard("error");
        error
    }

    fn finish(mut self, reason: &'static str) -> CapturedBody {
        let chunks = std::mem::take(&mut self.chunks);
        let count = chunks.len();
        let body = match count {
            0 => Bytes::new(),
            1 => chunks.into_iter().next().unwrap_or_default(),
            _ => {
                let mut joined = BytesMut::with_capacity(self.len);
                for chunk in &chunks {
                    joined.extend_from_slice(chunk);
                }
                joined.freeze()
            }
        };

        self.settle(reason, count, false);
        CapturedBody {
            headers: std::mem::take(&mut self.headers),
            body,
        }
    }

    fn discard(&mut self, reason: &'static str) {
        let count = self.chunks.len();
        self.chunks.clear();
        self.settle(reason, count, true);
    }

    fn settle(&mut self, reason: &'static str, chunks: usize, released: bool) {
        if !self.capturing {
            return;
        }
        self.capturing = false;

        if let Some(tracker) = &self.tracker {
            tracker.live_bytes.fetch_sub(self.len, Ordering::AcqRel);
            tracker.live_chunks.fetch_sub(chunks, Ordering::AcqRel);
            let counter = if released { &tracker.released } else { &tracker.finalized };
            counter.fetch_add(1, Ordering::AcqRel);
        }
        metrics::record_buffer_released(reason, self.len);
    }
}

impl Drop for ResponseBuffer {
    fn drop(&mut self) {
        if self.capturing {
            tracing::debug!(bytes = self.len, "Response buffer dropped mid-capture, releasing");
            self.discard("cancelled");
        }
    }
}

/// Headers for re-streaming a captured body: length removed, chunked set.
pub fn chunked_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    headers
}

/// Why a capture stopped without a body.
#[derive(Debug, Error)]
pub enum CaptureError<E> {
    /// The body stream failed; carries its error unchanged.
    #[error("upstream body failed: {0}")]
    Upstream(E),

    #[error("body capture cancelled")]
    Cancelled,
}

/// How a bounded capture ended.
#[derive(Debug)]
pub enum Capture<S> {
    /// The stream ended within the limit.
    Complete(CapturedBody),
    /// The limit was crossed. `captured` holds every byte read so far and
    /// `rest` the unread remainder of the stream.
    Overflow { captured: CapturedBody, rest: S },
}

/// Read `body` into `buffer` until it ends, fails, is cancelled, or grows
/// past `limit` bytes.
pub async fn capture<S, E>(
    mut buffer: ResponseBuffer,
    mut body: S,
    limit: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Capture<S>, CaptureError<E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    loop {
        match next_chunk(&mut body, cancel).await {
            Err(e) => return Err(buffer.release(e)),
            Ok(None) => return Ok(Capture::Complete(buffer.finalize())),
            Ok(Some(chunk)) => {
                buffer.append_chunk(chunk);
                if limit.is_some_and(|limit| buffer.len() > limit) {
                    return Ok(Capture::Overflow {
                        captured: buffer.finish("overflow"),
                        rest: body,
                    });
                }
            }
        }
    }
}

/// Read all of `body` into `buffer`.
pub async fn capture_all<S, E>(
    mut buffer: ResponseBuffer,
    mut body: S,
    cancel: &CancellationToken,
) -> Result<CapturedBody, CaptureError<E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    loop {
        match next_chunk(&mut body, cancel).await {
            Err(e) => return Err(buffer.release(e)),
            Ok(None) => return Ok(buffer.finalize()),
            Ok(Some(chunk)) => buffer.append_chunk(chunk),
        }
    }
}

async fn next_chunk<S, E>(body: &mut S, cancel: &CancellationToken) -> Result<Option<Bytes>, CaptureError<E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CaptureError::Cancelled),
        next = body.next() => match next {
            None => Ok(None),
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(CaptureError::Upstream(e)),
        },
    }
}
