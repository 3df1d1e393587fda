//! API gateway runtime core.
//!
//! Hot-swappable cache backends driven by control-plane plugin data, a
//! remote-call protocol registry, and a response buffering pipeline.

pub mod cache;
pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugin;
pub mod protocol;

pub use config::schema::GatewayConfig;
pub use context::GatewayContext;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
