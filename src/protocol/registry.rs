//! Protocol capability registry.

use std::sync::OnceLock;
use thiserror::Error;

use crate::protocol::RpcType;

/// Support flag per declared variant.
const SUPPORT_TABLE: [(RpcType, bool); 8] = [
    (RpcType::Http, true),
    (RpcType::Dubbo, true),
    (RpcType::Sofa, true),
    (RpcType::Tars, true),
    (RpcType::WebSocket, true),
    (RpcType::SpringCloud, true),
    (RpcType::Motan, true),
    (RpcType::Grpc, true),
];

/// Variants whose instances can be discovered through URI registration.
const URI_DISCOVERY: [RpcType; 5] = [
    RpcType::Grpc,
    RpcType::Http,
    RpcType::Tars,
    RpcType::SpringCloud,
    RpcType::Dubbo,
];

/// Variants that can publish service metadata.
const METADATA: [RpcType; 7] = [
    RpcType::Http,
    RpcType::Dubbo,
    RpcType::Grpc,
    RpcType::SpringCloud,
    RpcType::Sofa,
    RpcType::Tars,
    RpcType::Motan,
];

/// Errors raised by protocol lookups and registry construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// No supported protocol carries this name.
    #[error("this rpc type can not support {0}")]
    Unsupported(String),

    /// A capability subset names a protocol outside the supported set.
    #[error("{capability} capability lists unsupported rpc type {rpc_type}")]
    CapabilityOutsideSupported {
        capability: &'static str,
        rpc_type: RpcType,
    },
}

/// Immutable table of supported protocols and their optional capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRegistry {
    supported: Vec<RpcType>,
    uri_discovery: Vec<RpcType>,
    metadata: Vec<RpcType>,
}

impl ProtocolRegistry {
    /// The built-in registry, shared for the process lifetime.
    pub fn builtin() -> &'static ProtocolRegistry {
        static BUILTIN: OnceLock<ProtocolRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| ProtocolRegistry::with_disabled(&[]))
    }

    /// Build a registry from an explicit support table and capability lists.
    ///
    /// Variants absent from `table` are unsupported. Fails when either
    /// capability list names a variant that is not supported.
    pub fn new(
        table: &[(RpcType, bool)],
        uri_discovery: &[RpcType],
        metadata: &[RpcType],
    ) -> Result<Self, ProtocolError> {
        let supported: Vec<RpcType> = RpcType::ALL
            .into_iter()
            .filter(|t| table.iter().any(|(entry, flag)| entry == t && *flag))
            .collect();

        for (capability, list) in [("uri discovery", uri_discovery), ("metadata", metadata)] {
            if let Some(rpc_type) = list.iter().find(|t| !supported.contains(*t)) {
                return Err(ProtocolError::CapabilityOutsideSupported {
                    capability,
                    rpc_type: *rpc_type,
                });
            }
        }

        Ok(Self {
            supported,
            uri_discovery: uri_discovery.to_vec(),
            metadata: metadata.to_vec(),
        })
    }

    /// The built-in table with some variants switched off by operator config.
    ///
    /// Disabled variants drop out of every capability list as well, so the
    /// subset invariant holds without validation.
    pub fn with_disabled(disabled: &[RpcType]) -> Self {
        let enabled = |t: &RpcType| !disabled.contains(t);
        let table: Vec<(RpcType, bool)> = SUPPORT_TABLE
            .iter()
            .map(|(t, flag)| (*t, *flag && enabled(t)))
            .collect();
        let supported: Vec<RpcType> = table.iter().filter(|(_, f)| *f).map(|(t, _)| *t).collect();
        let keep = |list: &[RpcType]| -> Vec<RpcType> {
            list.iter().copied().filter(|t| supported.contains(t)).collect()
        };

        Self {
            uri_discovery: keep(&URI_DISCOVERY),
            metadata: keep(&METADATA),
            supported,
        }
    }

    /// Supported variants in declaration order.
    pub fn supported(&self) -> &[RpcType] {
        &self.supported
    }

    /// Variants discoverable through URI registration.
    pub fn uri_discovery_supported(&self) -> &[RpcType] {
        &self.uri_discovery
    }

    /// Variants able to publish service metadata.
    pub fn metadata_supported(&self) -> &[RpcType] {
        &self.metadata
    }

    pub fn is_supported(&self, rpc_type: RpcType) -> bool {
        self.supported.contains(&rpc_type)
    }

    /// Resolve a wire name to a supported variant.
    pub fn by_name(&self, name: &str) -> Result<RpcType, ProtocolError> {
        self.supported
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| ProtocolError::Unsupported(name.to_string()))
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        ProtocolRegistry::builtin().clone()
    }
}
