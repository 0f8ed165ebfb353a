// crates/stitch-store/tests/account_lookup.rs
//
// Account resolution through the store adapters.

use stitch_core::account::lookup_account;
use stitch_core::error::GatewayError;
use stitch_store::InMemoryCredentialStore;

#[tokio::test]
async fn test_lookup_resolves_public_key_and_keeps_extra_fields() {
    let store = InMemoryCredentialStore::from_accounts([(
        "k1",
        r#"{"publicKey":"-----BEGIN PUBLIC KEY-----","plan":"pro"}"#,
    )]);

    let account = lookup_account(&store, "k1").await.unwrap();
    assert_eq!(account.public_key, "-----BEGIN PUBLIC KEY-----");
    assert_eq!(account.extra["plan"], "pro");
}

#[tokio::test]
async fn test_lookup_unknown_key_is_resource_not_found() {
    let store = InMemoryCredentialStore::new();
    let err = lookup_account(&store, "nope").await.unwrap_err();
    assert!(matches!(err, GatewayError::ResourceNotFound(_)));
}

#[tokio::test]
async fn test_lookup_unusable_record_is_resource_not_found() {
    let store = InMemoryCredentialStore::from_accounts([("k1", "not json")]);
    let err = lookup_account(&store, "k1").await.unwrap_err();
    assert!(matches!(err, GatewayError::ResourceNotFound(_)));
}
