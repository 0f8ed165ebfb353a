// crates/stitch-gateway/src/state.rs
//
// GatewayState: everything a request handler needs, built once at startup.
//
// Constructed from GatewayConfig in main.rs (or directly through the
// builder methods in tests), then shared with the router behind an Arc.

use std::collections::HashMap;
use std::sync::Arc;

use stitch_core::crypto::EnvelopeCipher;
use stitch_core::error::GatewayError;
use stitch_core::traits::{CredentialStore, RpcClient};
use stitch_rpc::{HttpRpcClient, RelayDispatcher, SchemaFetcher};
use stitch_store::{InMemoryCredentialStore, RedisCredentialStore};

use crate::config::{CredentialStoreConfig, GatewayConfig};

/// Inbound decryption and outbound encryption settings.
pub struct EncryptionContext {
    pub cipher: EnvelopeCipher,
    /// The gateway's RSA private key (PEM), used to open client payloads.
    pub private_key_pem: String,
    /// Lower-cased request header carrying the caller's API key.
    pub api_key_header: String,
    /// Resolves API keys to the public keys responses are sealed for.
    pub store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("algorithm", &self.cipher.algorithm())
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}

/// One relay binding and schema fetcher per configured service.
#[derive(Debug, Default)]
pub struct GatewayState {
    relays: HashMap<String, RelayDispatcher>,
    schemas: HashMap<String, SchemaFetcher>,
    encryption: Option<EncryptionContext>,
}

impl GatewayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a backend reached through `client`.
    pub fn with_service(
        mut self,
        name: impl Into<String>,
        client: Arc<dyn RpcClient>,
        wrapper_token: &str,
    ) -> Self {
        let name = name.into();
        self.schemas.insert(
            name.clone(),
            SchemaFetcher::new(client.clone()).with_wrapper_token(wrapper_token),
        );
        self.relays.insert(name, RelayDispatcher::new(client));
        self
    }

    /// Enable encrypted payload handling.
    pub fn with_encryption(mut self, encryption: EncryptionContext) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Relay for `service`; unknown names fail like an unreachable backend.
    pub fn relay(&self, service: &str) -> Result<&RelayDispatcher, GatewayError> {
        self.relays
            .get(service)
            .ok_or_else(|| GatewayError::service(service))
    }

    pub fn schema_fetcher(&self, service: &str) -> Result<&SchemaFetcher, GatewayError> {
        self.schemas
            .get(service)
            .ok_or_else(|| GatewayError::service(service))
    }

    pub fn encryption(&self) -> Option<&EncryptionContext> {
        self.encryption.as_ref()
    }

    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.relays.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the full state from validated configuration.
    pub async fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut state = GatewayState::new();

        for (name, endpoint) in &config.services {
            let client = HttpRpcClient::new(endpoint.clone(), &config.rpc)?;
            tracing::info!(service = %name, endpoint = %endpoint, "Relay binding registered");
            state = state.with_service(name.clone(), Arc::new(client), &config.schema_wrapper_token);
        }

        if let Some(private_key_pem) = config.load_private_key()? {
            let store = build_store(&config.credential_store).await?;
            let cipher = EnvelopeCipher::new(config.encryption.algorithm.parse()?);
            tracing::info!(algorithm = %cipher.algorithm(), "Payload encryption enabled");
            state = state.with_encryption(EncryptionContext {
                cipher,
                private_key_pem,
                api_key_header: config.encryption.api_key_header.to_ascii_lowercase(),
                store,
            });
        }

        Ok(state)
    }
}

async fn build_store(
    config: &CredentialStoreConfig,
) -> Result<Arc<dyn CredentialStore>, GatewayError> {
    match &config.redis_url {
        Some(url) => Ok(Arc::new(
            RedisCredentialStore::connect(url, config.key_prefix.clone()).await?,
        )),
        None => {
            tracing::warn!(
                accounts = config.accounts.len(),
                "No redis_url configured; serving credentials from static accounts"
            );
            Ok(Arc::new(InMemoryCredentialStore::from_accounts(
                config.accounts.clone(),
            )))
        }
    }
}
