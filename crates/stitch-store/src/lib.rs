// crates/stitch-store/src/lib.rs
//
// stitch-store: Credential Store Adapter for the Stitch gateway.
//
// Resolves API keys to raw account JSON. The Redis adapter is used in
// deployments; the in-memory adapter backs tests and local runs configured
// with inline accounts.

pub mod memory;
pub mod redis_store;

pub use memory::InMemoryCredentialStore;
pub use redis_store::RedisCredentialStore;
