// crates/stitch-rpc/tests/http_roundtrip.rs
//
// Relay and schema fetch over real HTTP against a hosted backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use stitch_core::error::{BackendError, GatewayError};
use stitch_core::operation::{GraphQLRequest, Operation, RpcResponseEnvelope};
use stitch_core::traits::RpcClient;
use stitch_rpc::{
    get_schema, relay, BackendRpcServer, BackendService, HttpRpcClient, RpcClientConfig,
    RpcServerConfig,
};

struct UsersBackend;

#[async_trait]
impl BackendService for UsersBackend {
    async fn execute(&self, headers: BTreeMap<String, String>, query: String) -> RpcResponseEnvelope {
        if query.contains("broken") {
            return RpcResponseEnvelope::error(&BackendError {
                message: "Cannot query field \"broken\" on type \"Query\".".to_string(),
                extensions: None,
                locations: Some(json!([{"line": 1, "column": 3}])),
            });
        }
        RpcResponseEnvelope::data(&json!({
            "viewer": headers.get("authorization").cloned().unwrap_or_default(),
        }))
    }

    async fn schema(&self) -> String {
        "\"\"\"type Query { viewer: String }\"\"\"".to_string()
    }
}

async fn spawn_backend() -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let server = BackendRpcServer::new(RpcServerConfig::default(), Arc::new(UsersBackend));
        server
            .serve_with_listener(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (addr.to_string(), tx)
}

fn client(endpoint: &str, config: RpcClientConfig) -> Arc<dyn RpcClient> {
    Arc::new(HttpRpcClient::new(endpoint, &config).unwrap())
}

fn operation(query: &str) -> Operation {
    let mut headers = BTreeMap::new();
    headers.insert("authorization".to_string(), "Bearer alice".to_string());
    Operation::parse(
        GraphQLRequest {
            query: query.to_string(),
            operation_name: None,
            variables: None,
        },
        headers,
    )
    .unwrap()
}

#[tokio::test]
async fn test_relay_over_http() {
    let (endpoint, shutdown) = spawn_backend().await;
    let dispatcher = relay(client(&endpoint, RpcClientConfig::default()));

    let result = dispatcher.dispatch(&operation("{ viewer }")).await.unwrap();
    assert_eq!(result.data, json!({"viewer": "Bearer alice"}));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_relay_backend_error_over_http() {
    let (endpoint, shutdown) = spawn_backend().await;
    let dispatcher = relay(client(&endpoint, RpcClientConfig::default()));

    let err = dispatcher.dispatch(&operation("{ broken }")).await.unwrap_err();
    match err {
        GatewayError::Parser { locations, .. } => {
            assert_eq!(locations, Some(json!([{"line": 1, "column": 3}])));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_schema_over_http_with_pooling() {
    let (endpoint, shutdown) = spawn_backend().await;
    let config = RpcClientConfig {
        pool_connections: true,
        ..RpcClientConfig::default()
    };
    let shared = client(&endpoint, config);

    for _ in 0..3 {
        let schema = get_schema(shared.clone()).await.unwrap();
        assert_eq!(schema, "type Query { viewer: String }");
    }

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_unresponsive_backend_hits_deadline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and never answer.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let config = RpcClientConfig {
        timeout_ms: 200,
        ..RpcClientConfig::default()
    };
    let dispatcher = relay(client(&addr.to_string(), config));

    let err = dispatcher.dispatch(&operation("{ viewer }")).await.unwrap_err();
    match err {
        GatewayError::Unavailable { message, .. } => assert!(message.contains("200 ms")),
        other => panic!("unexpected error: {:?}", other),
    }
}
