//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for production)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging with key/value fields for machine parsing
//! - Request ID flows through every request-scoped event
//! - Cache subsystem faults show up as warnings and counters, never as errors
//!   returned to clients

pub mod logging;
pub mod metrics;
