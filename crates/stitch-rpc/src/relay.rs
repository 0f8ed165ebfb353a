// crates/stitch-rpc/src/relay.rs
//
// Relay Dispatcher: forwards one parsed operation to a bound backend and
// turns the reply envelope into an execution result or a gateway error.

use std::sync::Arc;

use serde_json::Value;

use stitch_core::error::{codes, BackendError, GatewayError};
use stitch_core::operation::{ExecutionResult, Operation, RpcResponseEnvelope};
use stitch_core::traits::{RpcClient, RpcMethod};

/// A relay binding: one backend endpoint, one owned client.
///
/// Calls are independent of each other; the dispatcher keeps no mutable
/// state and may be shared freely across concurrent requests.
#[derive(Clone)]
pub struct RelayDispatcher {
    client: Arc<dyn RpcClient>,
}

impl std::fmt::Debug for RelayDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayDispatcher")
            .field("endpoint", &self.client.endpoint())
            .finish()
    }
}

impl RelayDispatcher {
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self { client }
    }

    /// The backend address this dispatcher is bound to.
    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Relay `operation` with exactly one `execute` call. No retries.
    pub async fn dispatch(&self, operation: &Operation) -> Result<ExecutionResult, GatewayError> {
        let envelope = operation.to_rpc_request()?;
        let params = serde_json::to_value(&envelope)?;

        tracing::debug!(
            endpoint = %self.endpoint(),
            operation = operation.operation_name.as_deref().unwrap_or("<anonymous>"),
            "Relaying operation"
        );

        let reply = self.client.call(RpcMethod::Execute, params).await?;
        interpret_reply(self.endpoint(), reply)
    }
}

/// Bind a relay to `client`'s endpoint.
pub fn relay(client: Arc<dyn RpcClient>) -> RelayDispatcher {
    RelayDispatcher::new(client)
}

/// `error` wins over `data`; neither present is a contract violation.
fn interpret_reply(
    endpoint: &str,
    reply: RpcResponseEnvelope,
) -> Result<ExecutionResult, GatewayError> {
    if let Some(raw) = reply.error {
        let backend: BackendError = serde_json::from_str(&raw).unwrap_or(BackendError {
            message: raw,
            extensions: None,
            locations: None,
        });
        return Err(backend.into());
    }

    let raw = reply.data.ok_or_else(|| GatewayError::service(endpoint))?;
    let data: Value = serde_json::from_str(&raw).map_err(|e| {
        GatewayError::app(
            codes::UPSTREAM,
            format!("Service at {} returned malformed data: {}", endpoint, e),
        )
    })?;

    Ok(ExecutionResult { data })
}
