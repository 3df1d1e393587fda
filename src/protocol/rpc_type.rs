//! Remote-call protocol variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A remote-call protocol the gateway may route to.
///
/// The declaration order is the order every registry query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcType {
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "dubbo")]
    Dubbo,
    #[serde(rename = "sofa")]
    Sofa,
    #[serde(rename = "tars")]
    Tars,
    #[serde(rename = "websocket")]
    WebSocket,
    #[serde(rename = "springCloud")]
    SpringCloud,
    #[serde(rename = "motan")]
    Motan,
    #[serde(rename = "grpc")]
    Grpc,
}

impl RpcType {
    /// Every declared variant, in declaration order.
    pub const ALL: [RpcType; 8] = [
        RpcType::Http,
        RpcType::Dubbo,
        RpcType::Sofa,
        RpcType::Tars,
        RpcType::WebSocket,
        RpcType::SpringCloud,
        RpcType::Motan,
        RpcType::Grpc,
    ];

    /// Stable identifier used in wire and configuration data.
    pub fn name(self) -> &'static str {
        match self {
            RpcType::Http => "http",
            RpcType::Dubbo => "dubbo",
            RpcType::Sofa => "sofa",
            RpcType::Tars => "tars",
            RpcType::WebSocket => "websocket",
            RpcType::SpringCloud => "springCloud",
            RpcType::Motan => "motan",
            RpcType::Grpc => "grpc",
        }
    }
}

impl fmt::Display for RpcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses any declared variant, supported or not.
///
/// Use [`ProtocolRegistry::by_name`](super::ProtocolRegistry::by_name) when the
/// caller needs a protocol the gateway can actually serve.
impl FromStr for RpcType {
    type Err = UnknownRpcType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RpcType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownRpcType(s.to_string()))
    }
}

/// A name that matches no declared variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rpc type: {0}")]
pub struct UnknownRpcType(pub String);
