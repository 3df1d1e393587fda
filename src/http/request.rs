//! Request handling.
//!
//! # Responsibilities
//! - Assign a request ID (UUID v4) unless the client sent one
//! - Echo the request ID on the response
//! - Attach a per-request cancellation token tied to server shutdown
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Downstream stages read the token from request extensions and fall back to
//!   a fresh one, so they also run outside the server

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Request},
    middleware::Next,
    response::Response,
};
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer that stamps a fresh UUID on requests without an ID.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// The request ID, or `"unknown"` when absent or not valid UTF-8.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The cancellation token attached to `request`, or a fresh one.
pub fn cancellation_of<B>(request: &Request<B>) -> CancellationToken {
    request
        .extensions()
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_default()
}

/// Give each request a child of the server-wide shutdown token.
pub async fn attach_cancellation(
    State(shutdown): State<CancellationToken>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(shutdown.child_token());
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_id_falls_back_to_unknown() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");

        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(request_id(&headers), "abc-123");
    }

    #[test]
    fn test_cancellation_defaults_to_fresh_token() {
        let request = Request::new(Body::empty());
        assert!(!cancellation_of(&request).is_cancelled());
    }

    #[test]
    fn test_attached_token_follows_parent() {
        let parent = CancellationToken::new();
        let mut request = Request::new(Body::empty());
        request.extensions_mut().insert(parent.child_token());

        let token = cancellation_of(&request);
        parent.cancel();
        assert!(token.is_cancelled());
    }
}
