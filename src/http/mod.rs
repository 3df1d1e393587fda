//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, per-request cancellation token)
//!     → cache_layer.rs (snapshot lookup; on miss capture via buffer.rs)
//!     → upstream (hyper-util client)
//!     → Send to client
//! ```

pub mod buffer;
pub mod cache_layer;
pub mod request;
pub mod response;
pub mod server;

pub use buffer::{capture, capture_all, chunked_headers, BufferTracker, Capture, CaptureError, CapturedBody, ResponseBuffer};
pub use cache_layer::{fingerprint, response_cache_middleware, CacheLayerState, X_CACHE_STATUS};
pub use request::X_REQUEST_ID;
pub use response::rewrite_response;
pub use server::{GatewayServer, ServerError};
