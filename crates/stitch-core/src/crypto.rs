// crates/stitch-core/src/crypto.rs
//
// Envelope encryption for request and response payloads.
//
// Bulk data is encrypted under a fresh symmetric session (AES-CBC key + iv);
// the session itself is serialized as `{"key", "iv"}` and wrapped under the
// caller's RSA public key with PKCS#1 v1.5 padding. Both halves travel as
// base64 in an `{encryptedData, encryptedKey}` payload.

use std::fmt;
use std::str::FromStr;

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account::{lookup_account, AccountRecord};
use crate::error::{codes, GatewayError};
use crate::traits::CredentialStore;

/// IV length shared by every supported block mode.
pub const IV_LEN: usize = 16;

fn crypto_error(message: impl Into<String>) -> GatewayError {
    GatewayError::app(codes::CRYPTO, message)
}

// ---------------------------------------------------------------------------
// Algorithm selection
// ---------------------------------------------------------------------------

/// Symmetric algorithms selectable by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymmetricAlgorithm {
    Aes128Cbc,
    Aes192Cbc,
    #[default]
    Aes256Cbc,
}

impl SymmetricAlgorithm {
    /// Required key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            SymmetricAlgorithm::Aes128Cbc => 16,
            SymmetricAlgorithm::Aes192Cbc => 24,
            SymmetricAlgorithm::Aes256Cbc => 32,
        }
    }

    /// Identifier as used in configuration (`"aes-256-cbc"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            SymmetricAlgorithm::Aes128Cbc => "aes-128-cbc",
            SymmetricAlgorithm::Aes192Cbc => "aes-192-cbc",
            SymmetricAlgorithm::Aes256Cbc => "aes-256-cbc",
        }
    }
}

impl FromStr for SymmetricAlgorithm {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-128-cbc" => Ok(SymmetricAlgorithm::Aes128Cbc),
            "aes-192-cbc" => Ok(SymmetricAlgorithm::Aes192Cbc),
            "aes-256-cbc" => Ok(SymmetricAlgorithm::Aes256Cbc),
            other => Err(GatewayError::Config(format!(
                "Unsupported symmetric algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Symmetric encrypt/decrypt under a key and iv.
pub trait SymmetricCipher: Send + Sync {
    fn encrypt(
        &self,
        algorithm: SymmetricAlgorithm,
        plaintext: &[u8],
        key: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, GatewayError>;

    fn decrypt(
        &self,
        algorithm: SymmetricAlgorithm,
        ciphertext: &[u8],
        key: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, GatewayError>;
}

/// Asymmetric wrapping of small blobs (session material).
pub trait KeyWrap: Send + Sync {
    fn wrap_key(&self, public_key_pem: &str, blob: &[u8]) -> Result<Vec<u8>, GatewayError>;

    fn unwrap_key(&self, private_key_pem: &str, wrapped: &[u8])
        -> Result<Vec<u8>, GatewayError>;
}

/// AES in CBC mode with PKCS#7 padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesCbc;

impl AesCbc {
    fn invalid_length(algorithm: SymmetricAlgorithm, key: &[u8], iv: &[u8]) -> GatewayError {
        crypto_error(format!(
            "Invalid key or iv length for {}: key {} bytes (want {}), iv {} bytes (want {})",
            algorithm,
            key.len(),
            algorithm.key_len(),
            iv.len(),
            IV_LEN
        ))
    }
}

impl SymmetricCipher for AesCbc {
    fn encrypt(
        &self,
        algorithm: SymmetricAlgorithm,
        plaintext: &[u8],
        key: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, GatewayError> {
        let result = match algorithm {
            SymmetricAlgorithm::Aes128Cbc => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            SymmetricAlgorithm::Aes192Cbc => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            SymmetricAlgorithm::Aes256Cbc => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
                .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        };
        result.map_err(|_| Self::invalid_length(algorithm, key, iv))
    }

    fn decrypt(
        &self,
        algorithm: SymmetricAlgorithm,
        ciphertext: &[u8],
        key: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, GatewayError> {
        let result = match algorithm {
            SymmetricAlgorithm::Aes128Cbc => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)),
            SymmetricAlgorithm::Aes192Cbc => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)),
            SymmetricAlgorithm::Aes256Cbc => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
                .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)),
        };
        match result {
            Err(_) => Err(Self::invalid_length(algorithm, key, iv)),
            Ok(Err(_)) => Err(crypto_error("Bad decrypt: invalid padding")),
            Ok(Ok(plaintext)) => Ok(plaintext),
        }
    }
}

/// RSA key wrapping with PKCS#1 v1.5 padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaPkcs1v15;

impl KeyWrap for RsaPkcs1v15 {
    fn wrap_key(&self, public_key_pem: &str, blob: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let key = parse_public_key_pem(public_key_pem)?;
        key.encrypt(&mut OsRng, Pkcs1v15Encrypt, blob)
            .map_err(|e| crypto_error(format!("Key wrap failed: {}", e)))
    }

    fn unwrap_key(
        &self,
        private_key_pem: &str,
        wrapped: &[u8],
    ) -> Result<Vec<u8>, GatewayError> {
        let key = parse_private_key_pem(private_key_pem)?;
        key.decrypt(Pkcs1v15Encrypt, wrapped)
            .map_err(|e| crypto_error(format!("Key unwrap failed: {}", e)))
    }
}

/// Parse an RSA public key from SPKI (`BEGIN PUBLIC KEY`) or PKCS#1
/// (`BEGIN RSA PUBLIC KEY`) PEM.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, GatewayError> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| crypto_error(format!("Invalid public key: {}", e)))
}

/// Parse an RSA private key from PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1
/// (`BEGIN RSA PRIVATE KEY`) PEM.
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, GatewayError> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| crypto_error(format!("Invalid private key: {}", e)))
}

/// Generate an RSA keypair, returned as `(private PKCS#8 PEM, public SPKI PEM)`.
pub fn generate_rsa_keypair(bits: usize) -> Result<(String, String), GatewayError> {
    let private_key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| crypto_error(format!("Key generation failed: {}", e)))?;
    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| crypto_error(format!("Private key encoding failed: {}", e)))?;
    let public_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| crypto_error(format!("Public key encoding failed: {}", e)))?;
    Ok((private_pem.as_str().to_owned(), public_pem))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `{encryptedData, encryptedKey}`, used in both directions. Fields are
/// optional on the way in so partial input can be rejected explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
}

impl EncryptedPayload {
    /// Whether a JSON body carries either encrypted field.
    pub fn is_encrypted_body(body: &Value) -> bool {
        body.get("encryptedData").is_some() || body.get("encryptedKey").is_some()
    }

    /// `(data, key)` when both fields are present and non-empty.
    pub fn parts(&self) -> Option<(&str, &str)> {
        let data = self.encrypted_data.as_deref().filter(|s| !s.is_empty())?;
        let key = self.encrypted_key.as_deref().filter(|s| !s.is_empty())?;
        Some((data, key))
    }
}

fn incomplete_payload() -> GatewayError {
    GatewayError::Authentication(
        "Encrypted payload requires both encryptedData and encryptedKey".to_string(),
    )
}

/// The ephemeral key + iv for one encrypted response.
pub struct SymmetricSession {
    key: Vec<u8>,
    iv: [u8; IV_LEN],
}

#[derive(Serialize, Deserialize)]
struct SessionBlob {
    key: String,
    iv: String,
}

impl SymmetricSession {
    /// Draw fresh random session material for `algorithm`.
    pub fn generate(algorithm: SymmetricAlgorithm) -> Self {
        let mut key = vec![0u8; algorithm.key_len()];
        OsRng.fill_bytes(&mut key);
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    fn to_blob(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(serde_json::to_vec(&SessionBlob {
            key: BASE64.encode(&self.key),
            iv: BASE64.encode(self.iv),
        })?)
    }

    fn from_blob(blob: &[u8]) -> Result<Self, GatewayError> {
        let parsed: SessionBlob = serde_json::from_slice(blob)
            .map_err(|e| crypto_error(format!("Malformed session blob: {}", e)))?;
        let key = BASE64
            .decode(parsed.key)
            .map_err(|e| crypto_error(format!("Malformed session key: {}", e)))?;
        let iv: [u8; IV_LEN] = BASE64
            .decode(parsed.iv)
            .map_err(|e| crypto_error(format!("Malformed session iv: {}", e)))?
            .try_into()
            .map_err(|_| crypto_error(format!("Session iv must be {} bytes", IV_LEN)))?;
        Ok(Self { key, iv })
    }
}

impl fmt::Debug for SymmetricSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricSession")
            .field("key", &"<redacted>")
            .field("iv", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EnvelopeCipher
// ---------------------------------------------------------------------------

/// Hybrid envelope cipher: one symmetric algorithm plus the capabilities
/// used to encrypt bulk data and wrap session material.
#[derive(Debug, Clone)]
pub struct EnvelopeCipher<S = AesCbc, W = RsaPkcs1v15> {
    algorithm: SymmetricAlgorithm,
    symmetric: S,
    key_wrap: W,
}

impl EnvelopeCipher {
    /// AES-CBC for data, RSA PKCS#1 v1.5 for session wrapping.
    pub fn new(algorithm: SymmetricAlgorithm) -> Self {
        Self::with_capabilities(algorithm, AesCbc, RsaPkcs1v15)
    }
}

impl<S: SymmetricCipher, W: KeyWrap> EnvelopeCipher<S, W> {
    pub fn with_capabilities(algorithm: SymmetricAlgorithm, symmetric: S, key_wrap: W) -> Self {
        Self {
            algorithm,
            symmetric,
            key_wrap,
        }
    }

    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    /// Wrap `blob` under `public_key_pem`; returns base64.
    pub fn encrypt_key(&self, public_key_pem: &str, blob: &[u8]) -> Result<String, GatewayError> {
        let wrapped = self.key_wrap.wrap_key(public_key_pem, blob)?;
        Ok(BASE64.encode(wrapped))
    }

    /// Unwrap a base64 blob produced by [`Self::encrypt_key`].
    pub fn decrypt_key(
        &self,
        private_key_pem: &str,
        encrypted_blob: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        let wrapped = BASE64
            .decode(encrypted_blob.trim())
            .map_err(|e| crypto_error(format!("encryptedKey is not valid base64: {}", e)))?;
        self.key_wrap.unwrap_key(private_key_pem, &wrapped)
    }

    /// Encrypt `plaintext`; returns base64 ciphertext.
    pub fn encrypt_data(
        &self,
        plaintext: &[u8],
        key: &[u8],
        iv: &[u8],
    ) -> Result<String, GatewayError> {
        let ciphertext = self.symmetric.encrypt(self.algorithm, plaintext, key, iv)?;
        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt base64 ciphertext produced by [`Self::encrypt_data`].
    pub fn decrypt_data(
        &self,
        ciphertext: &str,
        key: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, GatewayError> {
        let raw = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| crypto_error(format!("encryptedData is not valid base64: {}", e)))?;
        self.symmetric.decrypt(self.algorithm, &raw, key, iv)
    }

    /// Decrypt a client-submitted payload into its plaintext.
    ///
    /// Both fields must be present and non-empty; otherwise this fails before any
    /// cryptographic work. Every unwrap, parse, or decrypt failure surfaces
    /// as [`GatewayError::Authentication`] and no partial plaintext escapes.
    pub fn decrypt_request(
        &self,
        payload: &EncryptedPayload,
        private_key_pem: &str,
    ) -> Result<String, GatewayError> {
        let (data, key) = payload.parts().ok_or_else(incomplete_payload)?;

        self.open(data, key, private_key_pem).map_err(|e| {
            tracing::debug!(error_code = %e.error_code(), "Encrypted request rejected");
            GatewayError::Authentication(format!("Unable to decrypt request: {}", e))
        })
    }

    fn open(&self, data: &str, key: &str, private_key_pem: &str) -> Result<String, GatewayError> {
        let blob = self.decrypt_key(private_key_pem, key)?;
        let session = SymmetricSession::from_blob(&blob)?;
        let plaintext = self.decrypt_data(data, session.key(), session.iv())?;
        String::from_utf8(plaintext)
            .map_err(|e| crypto_error(format!("Decrypted payload is not UTF-8: {}", e)))
    }

    /// Encrypt `payload` for the account behind `api_key`.
    ///
    /// An unknown key fails with [`GatewayError::ResourceNotFound`] before
    /// any cryptographic work. Every call draws a fresh session, so identical
    /// inputs never produce identical output.
    pub async fn encrypt_response<T>(
        &self,
        store: &dyn CredentialStore,
        payload: &T,
        api_key: &str,
    ) -> Result<EncryptedPayload, GatewayError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let account = lookup_account(store, api_key).await?;
        self.seal(&account, payload)
    }

    fn seal<T>(&self, account: &AccountRecord, payload: &T) -> Result<EncryptedPayload, GatewayError>
    where
        T: Serialize + ?Sized,
    {
        let session = SymmetricSession::generate(self.algorithm);
        let plaintext = serde_json::to_vec(payload)?;
        let encrypted_data = self.encrypt_data(&plaintext, session.key(), session.iv())?;
        let encrypted_key = self.encrypt_key(&account.public_key, &session.to_blob()?)?;

        Ok(EncryptedPayload {
            encrypted_data: Some(encrypted_data),
            encrypted_key: Some(encrypted_key),
        })
    }
}

// ---------------------------------------------------------------------------
// Free-function forms
// ---------------------------------------------------------------------------

/// Wrap a blob under an RSA public key (PKCS#1 v1.5); returns base64.
pub fn encrypt_key(public_key_pem: &str, blob: &[u8]) -> Result<String, GatewayError> {
    EnvelopeCipher::new(SymmetricAlgorithm::default()).encrypt_key(public_key_pem, blob)
}

/// Inverse of [`encrypt_key`].
pub fn decrypt_key(private_key_pem: &str, encrypted_blob: &str) -> Result<Vec<u8>, GatewayError> {
    EnvelopeCipher::new(SymmetricAlgorithm::default()).decrypt_key(private_key_pem, encrypted_blob)
}

/// Encrypt under the named algorithm; returns base64 ciphertext.
pub fn encrypt_data(
    plaintext: &[u8],
    key: &[u8],
    iv: &[u8],
    algorithm: &str,
) -> Result<String, GatewayError> {
    EnvelopeCipher::new(algorithm.parse()?).encrypt_data(plaintext, key, iv)
}

/// Inverse of [`encrypt_data`].
pub fn decrypt_data(
    ciphertext: &str,
    key: &[u8],
    iv: &[u8],
    algorithm: &str,
) -> Result<Vec<u8>, GatewayError> {
    EnvelopeCipher::new(algorithm.parse()?).decrypt_data(ciphertext, key, iv)
}

/// See [`EnvelopeCipher::decrypt_request`].
pub fn decrypt_request(
    payload: &EncryptedPayload,
    private_key_pem: &str,
    algorithm: &str,
) -> Result<String, GatewayError> {
    payload.parts().ok_or_else(incomplete_payload)?;
    let algorithm: SymmetricAlgorithm = algorithm
        .parse()
        .map_err(|e| GatewayError::Authentication(format!("Unable to decrypt request: {}", e)))?;
    EnvelopeCipher::new(algorithm).decrypt_request(payload, private_key_pem)
}

/// See [`EnvelopeCipher::encrypt_response`].
pub async fn encrypt_response<T>(
    store: &dyn CredentialStore,
    payload: &T,
    api_key: &str,
    algorithm: &str,
) -> Result<EncryptedPayload, GatewayError>
where
    T: Serialize + ?Sized + Sync,
{
    let account = lookup_account(store, api_key).await?;
    EnvelopeCipher::new(algorithm.parse()?).seal(&account, payload)
}
