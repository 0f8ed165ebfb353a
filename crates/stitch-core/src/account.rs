// crates/stitch-core/src/account.rs
//
// Account records resolved from the credential store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::traits::CredentialStore;

/// The record stored per API key. Only `publicKey` is interpreted; every
/// other field is preserved untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// PEM-encoded RSA public key used to wrap session material.
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountRecord {
    /// Parse the raw JSON string held by the store.
    pub fn from_json(raw: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(raw).map_err(|e| {
            GatewayError::ResourceNotFound(format!("Account record is unusable: {}", e))
        })
    }
}

/// Resolve `api_key` to its account record.
///
/// A missing key fails with [`GatewayError::ResourceNotFound`]. The record is
/// read once per call and never cached.
pub async fn lookup_account(
    store: &dyn CredentialStore,
    api_key: &str,
) -> Result<AccountRecord, GatewayError> {
    let raw = store
        .get(api_key)
        .await?
        .ok_or_else(|| GatewayError::ResourceNotFound("Account not found".to_string()))?;
    AccountRecord::from_json(&raw)
}
