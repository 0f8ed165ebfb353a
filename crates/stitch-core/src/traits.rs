// crates/stitch-core/src/traits.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::operation::RpcResponseEnvelope;

/// Trait for API-key → account lookups.
///
/// Implemented by stitch-store (Redis and in-memory backends).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the raw account JSON stored under `api_key`, if any.
    async fn get(&self, api_key: &str) -> Result<Option<String>, GatewayError>;
}

/// Methods a backend service exposes over RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RpcMethod {
    /// Execute a GraphQL operation.
    Execute,
    /// Return the backend's schema document.
    GetSchema,
}

impl RpcMethod {
    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::Execute => "execute",
            RpcMethod::GetSchema => "getSchema",
        }
    }

    /// Parse a wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "execute" => Some(RpcMethod::Execute),
            "getSchema" => Some(RpcMethod::GetSchema),
            _ => None,
        }
    }
}

/// Trait for a client bound to one backend endpoint.
///
/// Implemented by stitch-rpc (HTTP transport and in-process dispatch).
/// Each relay binding owns one client; whether it pools connections is the
/// implementation's choice.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// The backend address this client is bound to.
    fn endpoint(&self) -> &str;

    /// Issue exactly one call and return the backend's reply envelope.
    async fn call(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<RpcResponseEnvelope, GatewayError>;
}
