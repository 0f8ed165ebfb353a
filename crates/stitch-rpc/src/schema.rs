// crates/stitch-rpc/src/schema.rs
//
// Schema Fetcher: retrieves a backend's schema document over the relay's
// RPC channel for composition elsewhere.

use std::sync::Arc;

use serde_json::{json, Value};

use stitch_core::error::{codes, GatewayError};
use stitch_core::traits::{RpcClient, RpcMethod};

/// The fixed query sent to every backend.
pub const SCHEMA_QUERY: &str = "{ getSchema }";

/// Token backends wrap their schema text in.
pub const DEFAULT_WRAPPER_TOKEN: &str = "\"\"\"";

#[derive(Clone)]
pub struct SchemaFetcher {
    client: Arc<dyn RpcClient>,
    wrapper_token: String,
}

impl std::fmt::Debug for SchemaFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaFetcher")
            .field("endpoint", &self.client.endpoint())
            .field("wrapper_token", &self.wrapper_token)
            .finish()
    }
}

impl SchemaFetcher {
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self {
            client,
            wrapper_token: DEFAULT_WRAPPER_TOKEN.to_string(),
        }
    }

    /// Strip `token` instead of the default. An empty token strips nothing.
    pub fn with_wrapper_token(mut self, token: impl Into<String>) -> Self {
        self.wrapper_token = token.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Fetch the schema text.
    ///
    /// A backend `error` is surfaced untranslated as [`GatewayError::Upstream`].
    pub async fn fetch(&self) -> Result<String, GatewayError> {
        let reply = self
            .client
            .call(RpcMethod::GetSchema, json!({ "query": SCHEMA_QUERY }))
            .await?;

        if let Some(raw) = reply.error {
            return Err(GatewayError::Upstream { raw });
        }

        let raw = reply
            .data
            .ok_or_else(|| GatewayError::service(self.endpoint()))?;
        let data: Value = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::app(
                codes::UPSTREAM,
                format!(
                    "Service at {} returned malformed schema data: {}",
                    self.endpoint(),
                    e
                ),
            )
        })?;

        let schema = data.get("getSchema").and_then(Value::as_str).unwrap_or("");
        if self.wrapper_token.is_empty() {
            Ok(schema.to_string())
        } else {
            Ok(schema.replace(self.wrapper_token.as_str(), ""))
        }
    }
}

/// Fetch `client`'s schema with the default wrapper token.
pub async fn get_schema(client: Arc<dyn RpcClient>) -> Result<String, GatewayError> {
    SchemaFetcher::new(client).fetch().await
}
