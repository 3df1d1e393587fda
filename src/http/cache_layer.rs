//! Response cache middleware.
//!
//! # Responsibilities
//! - Fingerprint cacheable requests under the instance namespace
//! - Serve hits from the active backend, replaying the stored headers
//! - Capture and store successful upstream responses on a miss
//!
//! # Design Decisions
//! - One snapshot per request: a backend swap mid-request never mixes backends
//! - One record per response: headers and body share a single key
//! - Only GET with a 200 response is stored; HEAD is answered from the GET record
//! - Requests carrying credentials bypass the cache entirely
//! - Bodies past `max_body_bytes` stream through untouched and are not stored
//! - Any cache fault is a miss; the upstream response is always served

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::{stream, StreamExt};
use std::time::Duration;

use crate::cache::CacheBackend;
use crate::config::CachePluginConfig;
use crate::context::GatewayContext;
use crate::http::buffer::{capture, Capture, CaptureError, ResponseBuffer};
use crate::http::request::{cancellation_of, request_id, X_REQUEST_ID};
use crate::observability::metrics;

/// Response header reporting `HIT` or `MISS`.
pub const X_CACHE_STATUS: &str = "x-cache-status";

/// Headers that describe the connection or this exchange rather than the
/// representation. They are never written into a record.
static EXCHANGE_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::DATE,
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// State for [`response_cache_middleware`].
#[derive(Debug, Clone)]
pub struct CacheLayerState {
    ctx: GatewayContext,
    ttl: Duration,
    max_body_bytes: usize,
}

impl CacheLayerState {
    pub fn new(ctx: GatewayContext, config: &CachePluginConfig) -> Self {
        Self {
            ctx,
            ttl: Duration::from_secs(config.ttl_secs),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// Cache key for a request: `<prefix>:<METHOD>:<path and query>`.
pub fn fingerprint(prefix: &str, method: &Method, uri: &Uri) -> String {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{prefix}:{method}:{target}")
}

/// A stored response: replayable headers plus the full body.
///
/// Encoded as a 4-byte big-endian length, the JSON header list, then the
/// raw body bytes.
#[derive(Debug, Clone, PartialEq)]
struct CachedEntry {
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl CachedEntry {
    /// `None` when the response must not be stored.
    fn from_response(headers: &HeaderMap, body: Bytes) -> Option<Self> {
        if !storable(headers) {
            return None;
        }
        let mut kept = Vec::with_capacity(headers.len());
        for (name, value) in headers {
            if !replayable(name) {
                continue;
            }
            // A header that cannot round-trip as text would be lost on a hit.
            let value = value.to_str().ok()?;
            kept.push((name.as_str().to_string(), value.to_string()));
        }
        Some(Self { headers: kept, body })
    }

    fn encode(&self) -> Option<Bytes> {
        let head = serde_json::to_vec(&self.headers).ok()?;
        let head_len = u32::try_from(head.len()).ok()?;
        let mut record = BytesMut::with_capacity(4 + head.len() + self.body.len());
        record.put_u32(head_len);
        record.put_slice(&head);
        record.put_slice(&self.body);
        Some(record.freeze())
    }

    fn decode(record: Bytes) -> Option<Self> {
        let len_bytes: [u8; 4] = record.get(..4)?.try_into().ok()?;
        let end = 4usize.checked_add(u32::from_be_bytes(len_bytes) as usize)?;
        let headers = serde_json::from_slice(record.get(4..end)?).ok()?;
        Some(Self { headers, body: record.slice(end..) })
    }

    /// Rebuild the response. A HEAD hit carries the real length and no body.
    fn replay(self, head: bool) -> Response {
        let length = HeaderValue::from(self.body.len());
        let body = if head { Body::empty() } else { Body::from(self.body) };

        let mut response = Response::new(body);
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        headers.insert(header::CONTENT_LENGTH, length);
        mark(headers, "HIT");
        response
    }
}

fn replayable(name: &HeaderName) -> bool {
    !EXCHANGE_HEADERS.contains(name)
        && name.as_str() != "keep-alive"
        && name.as_str() != X_REQUEST_ID
        && name.as_str() != X_CACHE_STATUS
}

/// Responses that are specific to one client, or that vary on request
/// headers the fingerprint does not include, are not shared.
fn storable(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::SET_COOKIE) || headers.contains_key(header::VARY) {
        return false;
    }
    !headers.get_all(header::CACHE_CONTROL).iter().any(|value| {
        value.to_str().is_ok_and(|v| {
            v.split(',')
                .map(str::trim)
                .any(|d| d.eq_ignore_ascii_case("no-store") || d.eq_ignore_ascii_case("private"))
        })
    })
}

fn carries_credentials(headers: &HeaderMap) -> bool {
    headers.contains_key(header::AUTHORIZATION) || headers.contains_key(header::COOKIE)
}

pub async fn response_cache_middleware(
    State(state): State<CacheLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    if method != Method::GET && method != Method::HEAD {
        return next.run(request).await;
    }
    if carries_credentials(request.headers()) {
        tracing::trace!(request_id = %request_id(request.headers()), "Credentialed request bypasses cache");
        return next.run(request).await;
    }

    let Some(snapshot) = state.ctx.cache_snapshot() else {
        return next.run(request).await;
    };
    let backend = snapshot.backend();
    let kind = backend.kind().name();
    let head = method == Method::HEAD;
    let key = fingerprint(state.ctx.prefix(), &Method::GET, request.uri());

    if let Some(record) = backend.get(&key).await {
        match CachedEntry::decode(record) {
            Some(entry) => {
                metrics::record_cache_lookup(kind, true);
                tracing::debug!(
                    request_id = %request_id(request.headers()),
                    key = %key,
                    backend = kind,
                    "Serving cached response"
                );
                return entry.replay(head);
            }
            None => tracing::warn!(key = %key, backend = kind, "Discarding unreadable cache record"),
        }
    }
    metrics::record_cache_lookup(kind, false);

    if head {
        let mut response = next.run(request).await;
        if response.status() == StatusCode::OK {
            mark(response.headers_mut(), "MISS");
        }
        return response;
    }

    let cancel = cancellation_of(&request);
    let req_id = request_id(request.headers()).to_string();
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let buffer = ResponseBuffer::begin_capture(&parts.headers);

    match capture(buffer, body.into_data_stream(), Some(state.max_body_bytes), &cancel).await {
        Ok(Capture::Complete(captured)) => {
            store(backend.as_ref(), &key, &captured.headers, &captured.body, state.ttl).await;
            parts.headers = captured.headers;
            mark(&mut parts.headers, "MISS");
            Response::from_parts(parts, Body::from(captured.body))
        }
        Ok(Capture::Overflow { captured, rest }) => {
            tracing::debug!(
                request_id = %req_id,
                limit = state.max_body_bytes,
                "Response body too large to cache, streaming through"
            );
            let replay = stream::once(async move { Ok(captured.body) }).chain(rest);
            mark(&mut parts.headers, "MISS");
            Response::from_parts(parts, Body::from_stream(replay))
        }
        Err(CaptureError::Upstream(e)) => {
            tracing::warn!(request_id = %req_id, error = %e, "Upstream body failed during capture");
            (StatusCode::BAD_GATEWAY, "Upstream response failed").into_response()
        }
        Err(CaptureError::Cancelled) => {
            tracing::debug!(request_id = %req_id, "Response capture cancelled");
            (StatusCode::SERVICE_UNAVAILABLE, "Request cancelled").into_response()
        }
    }
}

async fn store(backend: &dyn CacheBackend, key: &str, headers: &HeaderMap, body: &Bytes, ttl: Duration) {
    let kind = backend.kind().name();
    let Some(record) = CachedEntry::from_response(headers, body.clone()).and_then(|e| e.encode()) else {
        tracing::debug!(key = %key, "Response not shareable, skipping store");
        return;
    };

    let accepted = backend.put(key, record, ttl).await;
    metrics::record_cache_store(kind, accepted);
    if !accepted {
        tracing::debug!(key = %key, backend = kind, "Cache store rejected");
    }
}

fn mark(headers: &mut HeaderMap, status: &'static str) {
    headers.insert(X_CACHE_STATUS, HeaderValue::from_static(status));
}
