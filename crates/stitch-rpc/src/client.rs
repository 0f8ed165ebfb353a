// crates/stitch-rpc/src/client.rs
//
// RpcClient implementations: HTTP JSON-RPC transport and in-process dispatch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stitch_core::error::GatewayError;
use stitch_core::operation::RpcResponseEnvelope;
use stitch_core::traits::{RpcClient, RpcMethod};

use crate::server::{self, BackendService, JsonRpcRequest, SERVICE_NAME};

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_pool_idle_per_host() -> usize {
    8
}

/// Per-client transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcClientConfig {
    /// Deadline for one call, covering connect, send, and body read.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retain idle connections to the endpoint between calls.
    #[serde(default)]
    pub pool_connections: bool,
    /// Idle connections kept when pooling is enabled.
    #[serde(default = "default_pool_idle_per_host")]
    pub pool_idle_per_host: usize,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            pool_connections: false,
            pool_idle_per_host: default_pool_idle_per_host(),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpRpcClient
// ---------------------------------------------------------------------------

/// JSON-RPC client that POSTs to a backend's `/{SERVICE_NAME}/{method}`.
///
/// One client is owned per relay binding. Each call runs under the
/// configured deadline; dropping the call future aborts the request.
#[derive(Debug, Clone)]
pub struct HttpRpcClient {
    endpoint: String,
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRpcClient {
    /// Build a client for `endpoint`. A bare `host:port` is treated as
    /// `http://host:port`.
    pub fn new(endpoint: impl Into<String>, config: &RpcClientConfig) -> Result<Self, GatewayError> {
        let endpoint = endpoint.into();
        let base_url = if endpoint.contains("://") {
            endpoint.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", endpoint.trim_end_matches('/'))
        };

        let builder = reqwest::Client::builder().tcp_keepalive(Duration::from_secs(30));
        let builder = if config.pool_connections {
            builder
                .pool_max_idle_per_host(config.pool_idle_per_host)
                .pool_idle_timeout(Duration::from_secs(90))
        } else {
            builder.pool_max_idle_per_host(0)
        };
        let client = builder
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build RPC client: {}", e)))?;

        Ok(Self {
            endpoint,
            base_url,
            client,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn method_url(&self, method: RpcMethod) -> String {
        format!("{}/{}/{}", self.base_url, SERVICE_NAME, method.as_str())
    }

    fn unavailable(&self, message: impl Into<String>) -> GatewayError {
        GatewayError::Unavailable {
            endpoint: self.endpoint.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<RpcResponseEnvelope, GatewayError> {
        let request = JsonRpcRequest {
            method: method.as_str().to_string(),
            params,
        };
        let url = self.method_url(method);

        let exchange = async {
            let resp = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, reqwest::Error>(resp.json::<RpcResponseEnvelope>().await?)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) if e.is_decode() => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Backend reply is not an RPC envelope");
                Err(GatewayError::service(self.endpoint.clone()))
            }
            Ok(Err(e)) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Backend RPC transport failure");
                Err(self.unavailable(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Backend RPC deadline elapsed"
                );
                Err(self.unavailable(format!(
                    "deadline of {} ms elapsed",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LocalRpcClient
// ---------------------------------------------------------------------------

/// Dispatches straight into an in-process backend, without a network hop.
pub struct LocalRpcClient<B> {
    endpoint: String,
    backend: Arc<B>,
}

impl<B: BackendService> LocalRpcClient<B> {
    pub fn new(endpoint: impl Into<String>, backend: Arc<B>) -> Self {
        Self {
            endpoint: endpoint.into(),
            backend,
        }
    }
}

#[async_trait]
impl<B: BackendService> RpcClient for LocalRpcClient<B> {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<RpcResponseEnvelope, GatewayError> {
        let request = JsonRpcRequest {
            method: method.as_str().to_string(),
            params,
        };
        Ok(server::dispatch(self.backend.as_ref(), request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: RpcClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.timeout_ms, 10_000);
        assert!(!config.pool_connections);
        assert_eq!(config.pool_idle_per_host, 8);
    }

    #[test]
    fn test_bare_endpoint_gets_http_scheme() {
        let client = HttpRpcClient::new("users:50051", &RpcClientConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "users:50051");
        assert_eq!(
            client.method_url(RpcMethod::Execute),
            "http://users:50051/stitch.rpc.Backend/execute"
        );
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        let client =
            HttpRpcClient::new("https://users.internal/", &RpcClientConfig::default()).unwrap();
        assert_eq!(
            client.method_url(RpcMethod::GetSchema),
            "https://users.internal/stitch.rpc.Backend/getSchema"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpRpcClient::new(addr.to_string(), &RpcClientConfig::default()).unwrap();
        let err = client
            .call(RpcMethod::Execute, serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            GatewayError::Unavailable { endpoint, .. } => assert_eq!(endpoint, addr.to_string()),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
