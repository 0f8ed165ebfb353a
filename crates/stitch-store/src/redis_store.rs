// crates/stitch-store/src/redis_store.rs
//
// Redis-backed credential store.
//
// Key format:
//   - `{key_prefix}{api_key}` -> account JSON (`{"publicKey": "...", ...}`)

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use stitch_core::error::GatewayError;
use stitch_core::traits::CredentialStore;

/// Credential store reading account records from Redis.
///
/// Holds a `ConnectionManager`, which reconnects on its own and is cheap to
/// clone per call.
#[derive(Clone)]
pub struct RedisCredentialStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCredentialStore {
    /// Connect to Redis. Supports both `redis://` and `rediss://` URLs.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, GatewayError> {
        let client = redis::Client::open(url)
            .map_err(|e| GatewayError::Store(format!("Invalid Redis URL {}: {}", url, e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| GatewayError::Store(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!(url = %redact_url(url), "Connected to credential store");
        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
        })
    }

    /// Build the Redis key for an API key.
    fn account_key(&self, api_key: &str) -> String {
        format!("{}{}", self.key_prefix, api_key)
    }

    /// Store an account record. Used by provisioning tooling and tests.
    pub async fn put(&self, api_key: &str, account_json: &str) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.account_key(api_key), account_json)
            .await
            .map_err(|e| GatewayError::Store(format!("Redis SET failed: {}", e)))
    }
}

#[async_trait]
impl CredentialStore for RedisCredentialStore {
    async fn get(&self, api_key: &str) -> Result<Option<String>, GatewayError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(self.account_key(api_key))
            .await
            .map_err(|e| GatewayError::Store(format!("Redis GET failed: {}", e)))
    }
}

/// Strip credentials from a Redis URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
