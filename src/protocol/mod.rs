//! Remote-call protocol capabilities.
//!
//! # Data Flow
//! ```text
//! RpcType (closed set of wire names)
//!     → registry.rs (support flags + designed capability subsets)
//!     → ProtocolRegistry (immutable, shared via Arc / &'static)
//!     → callers: by_name() for selector/rule data, subset queries for
//!       URI discovery and metadata publication
//! ```
//!
//! # Design Decisions
//! - Support flags and subsets are static design data, never inferred
//! - Lookups are exact and case-sensitive on the wire name
//! - A known but unsupported protocol fails lookup like an unknown one
//! - Subsets are validated against the supported set at construction

pub mod registry;
pub mod rpc_type;

pub use registry::{ProtocolError, ProtocolRegistry};
pub use rpc_type::RpcType;
