// crates/stitch-rpc/src/server.rs
//
// Backend-side RPC server: BackendService, BackendRpcServer, RpcServerConfig.
//
// A single tonic service accepts JSON-encoded `{method, params}` requests
// over HTTP/1 or HTTP/2 at `/{SERVICE_NAME}/{method}`, dispatches to the
// hosted backend, and answers with an `{data?, error?}` envelope. No proto
// codegen is involved; tonic provides transport and interceptors.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::Status;

use stitch_core::operation::{RpcRequestEnvelope, RpcResponseEnvelope};
use stitch_core::traits::RpcMethod;

use crate::middleware;

/// Route prefix every backend RPC method is served under.
pub const SERVICE_NAME: &str = "stitch.rpc.Backend";

// ---------------------------------------------------------------------------
// RpcServerConfig
// ---------------------------------------------------------------------------

/// Configuration for a backend RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcServerConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
        }
    }
}

// ---------------------------------------------------------------------------
// BackendService
// ---------------------------------------------------------------------------

/// A GraphQL backend reachable over the gateway's RPC protocol.
#[async_trait]
pub trait BackendService: Send + Sync + 'static {
    /// Execute a raw query with the client's forwarded headers.
    async fn execute(&self, headers: BTreeMap<String, String>, query: String)
        -> RpcResponseEnvelope;

    /// The backend's schema document.
    async fn schema(&self) -> String;
}

/// A JSON-RPC-style request envelope: a method name plus JSON params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The RPC method to invoke ("execute" or "getSchema").
    pub method: String,
    /// JSON-encoded parameters for the method.
    pub params: serde_json::Value,
}

/// Dispatch one request to a backend and build its reply envelope.
///
/// Malformed params and unknown methods answer with an `error` envelope
/// rather than failing the transport.
pub async fn dispatch<B>(backend: &B, request: JsonRpcRequest) -> RpcResponseEnvelope
where
    B: BackendService + ?Sized,
{
    match RpcMethod::from_wire(&request.method) {
        Some(RpcMethod::Execute) => {
            let envelope: RpcRequestEnvelope = match serde_json::from_value(request.params) {
                Ok(e) => e,
                Err(e) => {
                    return RpcResponseEnvelope::error_message(format!(
                        "Invalid execute params: {}",
                        e
                    ))
                }
            };
            let headers: BTreeMap<String, String> = if envelope.headers.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&envelope.headers) {
                    Ok(h) => h,
                    Err(e) => {
                        return RpcResponseEnvelope::error_message(format!(
                            "Invalid forwarded headers: {}",
                            e
                        ))
                    }
                }
            };
            backend.execute(headers, envelope.query).await
        }
        Some(RpcMethod::GetSchema) => {
            let schema = backend.schema().await;
            RpcResponseEnvelope::data(&json!({ "getSchema": schema }))
        }
        None => {
            tracing::warn!(method = %request.method, "Unknown backend RPC method");
            RpcResponseEnvelope::error_message(format!("Unknown method: {}", request.method))
        }
    }
}

// ---------------------------------------------------------------------------
// BackendRpcServer
// ---------------------------------------------------------------------------

/// Hosts a [`BackendService`] on tonic's transport.
pub struct BackendRpcServer<B> {
    config: RpcServerConfig,
    backend: Arc<B>,
}

impl<B> std::fmt::Debug for BackendRpcServer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRpcServer")
            .field("config", &self.config)
            .finish()
    }
}

impl<B: BackendService> BackendRpcServer<B> {
    pub fn new(config: RpcServerConfig, backend: Arc<B>) -> Self {
        Self { config, backend }
    }

    fn router(&self) -> tonic::transport::server::Router {
        Server::builder().accept_http1(true).add_service(
            tonic::service::interceptor::InterceptedService::new(
                BackendJsonRpcService::new(self.backend.clone()),
                middleware::logging_interceptor,
            ),
        )
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("Backend RPC server starting on {}", addr);

        self.router().serve(addr).await?;
        Ok(())
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve_with_listener<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()> + Send,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Backend RPC server listening on {}", addr);
        }
        self.router()
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------
// One named service; the method is carried in the JSON body. Request and
// response bodies are raw JSON bytes.

/// Low-level tower service: reads the body, decodes the JSON-RPC request,
/// dispatches, and writes the reply envelope.
pub struct BackendJsonRpcService<B> {
    backend: Arc<B>,
}

impl<B> Clone for BackendJsonRpcService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B> std::fmt::Debug for BackendJsonRpcService<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendJsonRpcService").finish()
    }
}

impl<B> BackendJsonRpcService<B> {
    fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

impl<B> tonic::server::NamedService for BackendJsonRpcService<B> {
    const NAME: &'static str = SERVICE_NAME;
}

impl<B, Body> tower_service::Service<http::Request<Body>> for BackendJsonRpcService<B>
where
    B: BackendService,
    Body: HttpBody + Send + 'static,
    Body::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    Body::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Body>) -> Self::Future {
        let backend = self.backend.clone();

        Box::pin(async move {
            let body_bytes = match collect_body(req.into_body()).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("Failed to read request body: {}", e);
                    let reply = RpcResponseEnvelope::error_message(format!(
                        "Failed to read request body: {}",
                        e
                    ));
                    return Ok(build_response(&reply));
                }
            };

            let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
                Ok(r) => r,
                Err(e) => {
                    let reply = RpcResponseEnvelope::error_message(format!(
                        "Invalid JSON-RPC request: {}",
                        e
                    ));
                    return Ok(build_response(&reply));
                }
            };

            let reply = dispatch(backend.as_ref(), rpc_request).await;
            Ok(build_response(&reply))
        })
    }
}

/// Buffer a request body; trailers are dropped.
async fn collect_body<B>(body: B) -> Result<bytes::Bytes, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| e.into().to_string())
}

/// Build a 200 JSON response carrying `reply`.
fn build_response(reply: &RpcResponseEnvelope) -> http::Response<tonic::body::BoxBody> {
    let json = serde_json::to_vec(reply).unwrap_or_else(|_| b"{}".to_vec());
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_core::error::BackendError;
    use tower_service::Service;

    struct EchoBackend;

    #[async_trait]
    impl BackendService for EchoBackend {
        async fn execute(
            &self,
            headers: BTreeMap<String, String>,
            query: String,
        ) -> RpcResponseEnvelope {
            if query.contains("fail") {
                return RpcResponseEnvelope::error(&BackendError {
                    message: "boom".to_string(),
                    extensions: Some(json!({"code": "BAD"})),
                    locations: None,
                });
            }
            RpcResponseEnvelope::data(&json!({ "query": query, "headers": headers }))
        }

        async fn schema(&self) -> String {
            "type Query { ping: String }".to_string()
        }
    }

    fn execute_request(headers: &str, query: &str) -> JsonRpcRequest {
        JsonRpcRequest {
            method: "execute".to_string(),
            params: json!({ "headers": headers, "query": query }),
        }
    }

    #[tokio::test]
    async fn test_dispatch_execute_forwards_headers_and_query() {
        let reply = dispatch(&EchoBackend, execute_request(r#"{"x-a":"1"}"#, "{ ping }")).await;
        let data: serde_json::Value = serde_json::from_str(&reply.data.unwrap()).unwrap();
        assert_eq!(data["query"], "{ ping }");
        assert_eq!(data["headers"]["x-a"], "1");
        assert!(reply.error.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_execute_backend_error() {
        let reply = dispatch(&EchoBackend, execute_request("{}", "{ fail }")).await;
        let error: BackendError = serde_json::from_str(&reply.error.unwrap()).unwrap();
        assert_eq!(error.message, "boom");
        assert_eq!(error.extensions, Some(json!({"code": "BAD"})));
    }

    #[tokio::test]
    async fn test_dispatch_get_schema() {
        let request = JsonRpcRequest {
            method: "getSchema".to_string(),
            params: json!({ "query": "{ getSchema }" }),
        };
        let reply = dispatch(&EchoBackend, request).await;
        let data: serde_json::Value = serde_json::from_str(&reply.data.unwrap()).unwrap();
        assert_eq!(data["getSchema"], "type Query { ping: String }");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method_and_bad_params() {
        let unknown = JsonRpcRequest {
            method: "mutate".to_string(),
            params: json!({}),
        };
        let reply = dispatch(&EchoBackend, unknown).await;
        assert!(reply.error.unwrap().contains("Unknown method"));

        let bad = JsonRpcRequest {
            method: "execute".to_string(),
            params: json!({ "query": 42 }),
        };
        let reply = dispatch(&EchoBackend, bad).await;
        assert!(reply.data.is_none());
        assert!(reply.error.is_some());
    }

    #[tokio::test]
    async fn test_collect_body_buffers_whole_payload() {
        let body = http_body_util::Full::new(bytes::Bytes::from_static(br#"{"method":"execute"}"#));
        let collected = collect_body(body).await.unwrap();
        assert_eq!(&collected[..], br#"{"method":"execute"}"#);
    }

    #[tokio::test]
    async fn test_service_rejects_malformed_body() {
        let mut service = BackendJsonRpcService::new(Arc::new(EchoBackend));
        let req = http::Request::builder()
            .uri(format!("/{}/execute", SERVICE_NAME))
            .body(http_body_util::Full::new(bytes::Bytes::from_static(b"not json")))
            .unwrap();

        let resp = service.call(req).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let reply: RpcResponseEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert!(reply.error.unwrap().contains("Invalid JSON-RPC request"));
    }
}
