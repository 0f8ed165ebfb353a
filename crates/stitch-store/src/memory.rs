// crates/stitch-store/src/memory.rs
//
// In-memory credential store for tests and inline-configured accounts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use stitch_core::error::GatewayError;
use stitch_core::traits::CredentialStore;

/// HashMap-backed credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from `api_key -> account JSON` pairs.
    pub fn from_accounts<I, K, V>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            accounts: RwLock::new(
                accounts
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub async fn insert(&self, api_key: impl Into<String>, account_json: impl Into<String>) {
        self.accounts
            .write()
            .await
            .insert(api_key.into(), account_json.into());
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, api_key: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.accounts.read().await.get(api_key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_present_and_absent() {
        let store = InMemoryCredentialStore::from_accounts([("k1", r#"{"publicKey":"x"}"#)]);
        assert_eq!(
            store.get("k1").await.unwrap().as_deref(),
            Some(r#"{"publicKey":"x"}"#)
        );
        assert!(store.get("k2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_overwrites() {
        let store = InMemoryCredentialStore::new();
        assert!(store.is_empty().await);
        store.insert("k1", "a").await;
        store.insert("k1", "b").await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("k1").await.unwrap().as_deref(), Some("b"));
    }
}
