// crates/stitch-gateway/src/lib.rs
//
// stitch-gateway: the gateway process.
//
// Wires configuration, credential store, encryption, relay bindings, and
// the error translator behind an axum router. The binary in main.rs only
// adds argument parsing, tracing setup, and the listener.

pub mod config;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::GatewayConfig;
pub use routes::router;
pub use state::{EncryptionContext, GatewayState};
