// crates/stitch-gateway/src/config.rs
//
// Runtime configuration for the Stitch gateway.
// Loaded from a TOML file or populated with sensible defaults.

use std::collections::BTreeMap;
use std::fs;

use serde::Deserialize;

use stitch_core::crypto::{parse_private_key_pem, SymmetricAlgorithm};
use stitch_core::error::GatewayError;
use stitch_rpc::RpcClientConfig;

/// Runtime configuration for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Host address for the HTTP listener.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP listener.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Backend services: name -> RPC endpoint (e.g. `users = "10.0.0.2:50051"`).
    #[serde(default)]
    pub services: BTreeMap<String, String>,

    /// Transport settings shared by every relay binding.
    #[serde(default)]
    pub rpc: RpcClientConfig,

    #[serde(default)]
    pub encryption: EncryptionConfig,

    #[serde(default)]
    pub credential_store: CredentialStoreConfig,

    /// Token stripped from fetched schema text.
    #[serde(default = "default_schema_wrapper_token")]
    pub schema_wrapper_token: String,
}

/// `[encryption]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Symmetric algorithm identifier, e.g. "aes-256-cbc".
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Key-wrap padding. Only "pkcs1v15" is supported.
    #[serde(default = "default_padding")]
    pub padding: String,

    /// PEM file holding the gateway's RSA private key.
    #[serde(default)]
    pub private_key_path: Option<String>,

    /// Request header carrying the caller's API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
}

/// `[credential_store]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialStoreConfig {
    /// Redis URL. When unset, `accounts` is served from memory.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix prepended to every API key before lookup.
    #[serde(default)]
    pub key_prefix: String,

    /// Static api-key -> account JSON records.
    #[serde(default)]
    pub accounts: BTreeMap<String, String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_schema_wrapper_token() -> String {
    stitch_rpc::DEFAULT_WRAPPER_TOKEN.to_string()
}

fn default_algorithm() -> String {
    "aes-256-cbc".to_string()
}

fn default_padding() -> String {
    "pkcs1v15".to_string()
}

fn default_api_key_header() -> String {
    "x-api-key".to_string()
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            algorithm: default_algorithm(),
            padding: default_padding(),
            private_key_path: None,
            api_key_header: default_api_key_header(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            services: BTreeMap::new(),
            rpc: RpcClientConfig::default(),
            encryption: EncryptionConfig::default(),
            credential_store: CredentialStoreConfig::default(),
            schema_wrapper_token: default_schema_wrapper_token(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: GatewayConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if !matches!(self.log_format.to_ascii_lowercase().as_str(), "text" | "json") {
            return Err(GatewayError::Config(format!(
                "log_format must be \"text\" or \"json\", got \"{}\"",
                self.log_format
            )));
        }

        if self.rpc.timeout_ms == 0 {
            return Err(GatewayError::Config(
                "rpc.timeout_ms must be greater than zero".to_string(),
            ));
        }

        let encryption = &self.encryption;
        encryption.algorithm.parse::<SymmetricAlgorithm>()?;
        if !encryption.padding.eq_ignore_ascii_case("pkcs1v15") {
            return Err(GatewayError::Config(format!(
                "Unsupported key-wrap padding \"{}\"; only \"pkcs1v15\" is available",
                encryption.padding
            )));
        }
        if encryption.enabled && encryption.private_key_path.is_none() {
            return Err(GatewayError::Config(
                "encryption.enabled requires encryption.private_key_path".to_string(),
            ));
        }
        if encryption.api_key_header.trim().is_empty() {
            return Err(GatewayError::Config(
                "encryption.api_key_header must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Read and parse the private key when encryption is enabled.
    pub fn load_private_key(&self) -> Result<Option<String>, GatewayError> {
        if !self.encryption.enabled {
            return Ok(None);
        }
        let path = self.encryption.private_key_path.as_deref().ok_or_else(|| {
            GatewayError::Config("encryption.private_key_path is not set".to_string())
        })?;
        let pem = fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("Cannot read private key at {}: {}", path, e))
        })?;
        parse_private_key_pem(&pem)
            .map_err(|e| GatewayError::Config(format!("Private key at {} is unusable: {}", path, e)))?;
        Ok(Some(pem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = GatewayConfig::from_toml("").unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.rpc.timeout_ms, 10_000);
        assert!(!config.rpc.pool_connections);
        assert!(!config.encryption.enabled);
        assert_eq!(config.encryption.algorithm, "aes-256-cbc");
        assert_eq!(config.encryption.api_key_header, "x-api-key");
        assert_eq!(config.schema_wrapper_token, "\"\"\"");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_file() {
        let config = GatewayConfig::from_toml(
            r#"
            host = "0.0.0.0"
            port = 8080
            log_format = "json"

            [services]
            users = "10.0.0.2:50051"
            catalog = "http://catalog:50051"

            [rpc]
            timeout_ms = 2500
            pool_connections = true

            [encryption]
            enabled = true
            algorithm = "aes-128-cbc"
            private_key_path = "/etc/stitch/private.pem"

            [credential_store]
            redis_url = "redis://cache:6379"
            key_prefix = "apikey:"
            "#,
        )
        .unwrap();

        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services["users"], "10.0.0.2:50051");
        assert_eq!(config.rpc.timeout_ms, 2500);
        assert_eq!(config.rpc.pool_idle_per_host, 8);
        assert_eq!(config.credential_store.key_prefix, "apikey:");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.encryption.padding = "oaep".to_string();
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));

        let mut config = GatewayConfig::default();
        config.encryption.algorithm = "rc4".to_string();
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));

        let mut config = GatewayConfig::default();
        config.encryption.enabled = true;
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));

        let mut config = GatewayConfig::default();
        config.log_format = "xml".to_string();
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_missing_private_key_file() {
        let mut config = GatewayConfig::default();
        config.encryption.enabled = true;
        config.encryption.private_key_path = Some("/nonexistent/stitch/private.pem".to_string());
        assert!(matches!(
            config.load_private_key(),
            Err(GatewayError::Config(_))
        ));
    }
}
