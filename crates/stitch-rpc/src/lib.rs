// crates/stitch-rpc/src/lib.rs
//
// stitch-rpc: Downstream RPC plumbing for the Stitch gateway.
//
// The gateway side relays operations and fetches schemas through an
// `RpcClient` bound to one backend endpoint. The backend side hosts a
// `BackendService` on tonic's transport using JSON-over-HTTP rather than
// protobuf codegen, so both halves share one envelope format.

pub mod client;
pub mod middleware;
pub mod relay;
pub mod schema;
pub mod server;

// Re-export the main types for ergonomic access.
pub use client::{HttpRpcClient, LocalRpcClient, RpcClientConfig};
pub use relay::{relay, RelayDispatcher};
pub use schema::{get_schema, SchemaFetcher, DEFAULT_WRAPPER_TOKEN, SCHEMA_QUERY};
pub use server::{BackendRpcServer, BackendService, JsonRpcRequest, RpcServerConfig, SERVICE_NAME};
