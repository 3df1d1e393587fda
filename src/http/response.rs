//! Response body rewriting.
//!
//! # Responsibilities
//! - Capture a full response body through [`ResponseBuffer`]
//! - Apply a rewrite and re-stream it with chunked framing
//!
//! # Design Decisions
//! - The rewritten body's length is unknown to the caller, so headers go
//!   through `chunked_headers`
//! - Capture failures come back unchanged for the caller to map

use axum::{body::Body, response::Response};
use bytes::Bytes;
use futures_util::stream;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;

use crate::http::buffer::{capture_all, chunked_headers, CaptureError, ResponseBuffer};

/// Capture `response`, pass its body through `rewrite`, and stream the result.
pub async fn rewrite_response<F>(
    response: Response,
    cancel: &CancellationToken,
    rewrite: F,
) -> Result<Response, CaptureError<axum::Error>>
where
    F: FnOnce(Bytes) -> Bytes,
{
    let (mut parts, body) = response.into_parts();
    let buffer = ResponseBuffer::begin_capture(&parts.headers);
    let captured = capture_all(buffer, body.into_data_stream(), cancel).await?;

    let rewritten = rewrite(captured.body);
    parts.headers = chunked_headers(&captured.headers);

    let body = Body::from_stream(stream::once(async move { Ok::<_, Infallible>(rewritten) }));
    Ok(Response::from_parts(parts, body))
}
