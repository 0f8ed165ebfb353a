// crates/stitch-cli/src/commands/mod.rs
//
// Command module declarations for the Stitch CLI.

pub mod keygen;
pub mod query;
pub mod schema;

use std::sync::Arc;

use stitch_core::error::GatewayError;
use stitch_core::traits::RpcClient;
use stitch_rpc::{HttpRpcClient, RpcClientConfig};

/// One-shot client for a single CLI invocation.
pub fn connect(endpoint: &str, timeout_ms: u64) -> Result<Arc<dyn RpcClient>, GatewayError> {
    let config = RpcClientConfig {
        timeout_ms,
        ..RpcClientConfig::default()
    };
    Ok(Arc::new(HttpRpcClient::new(endpoint, &config)?))
}
