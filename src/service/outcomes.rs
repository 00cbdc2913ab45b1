//! Results returned by [`super::CryptoService`].
//!
//! Durations are kept as milliseconds (`f64`) and serialized as display
//! strings such as `"12.34 ms"`.

use crate::common::utils::serialize_ms;
use crate::hashing::HashAlgorithm;
use crate::statistics::{KeySummary, RegistryStatistics};
use crate::store::{KeyStatus, KeyType};
use serde::Serialize;

/// 密钥生成请求
#[derive(Debug, Clone)]
pub struct GenerateKeyRequest {
    pub key_type: KeyType,
    /// Falls back to the configured default size.
    pub key_size: Option<usize>,
    pub label: Option<String>,
}

impl Default for GenerateKeyRequest {
    fn default() -> Self {
        Self {
            key_type: KeyType::Rsa,
            key_size: None,
            label: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedKey {
    pub key_id: String,
    pub key_type: KeyType,
    pub key_size: usize,
    pub key_label: Option<String>,
    pub stored_in_db: bool,
    #[serde(serialize_with = "serialize_ms")]
    pub processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyListing {
    pub keys: Vec<KeySummary>,
    pub statistics: RegistryStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub key_id: String,
    pub new_status: KeyStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignOutcome {
    pub signature: String,
    pub key_id: String,
    #[serde(serialize_with = "serialize_ms")]
    pub processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub key_id: String,
    #[serde(serialize_with = "serialize_ms")]
    pub processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncryptOutcome {
    /// `<key_id>:<base64 envelope>`
    pub encrypted_data: String,
    pub key_id: String,
    #[serde(serialize_with = "serialize_ms")]
    pub processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecryptOutcome {
    /// UTF-8 text, or lowercase hex when the plaintext is not valid UTF-8.
    pub decrypted_data: String,
    pub key_id: String,
    #[serde(serialize_with = "serialize_ms")]
    pub processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    #[serde(serialize_with = "serialize_ms")]
    pub hash_time: f64,
    #[serde(serialize_with = "serialize_ms")]
    pub sign_time: f64,
    #[serde(serialize_with = "serialize_ms")]
    pub total_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashAndSignOutcome {
    pub hash: String,
    pub hash_algorithm: HashAlgorithm,
    pub signature: String,
    pub key_id: String,
    pub performance: Performance,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashSignatureVerification {
    pub valid: bool,
    pub integrity_valid: bool,
    pub signature_valid: bool,
    pub message: String,
    pub key_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashOutcome {
    pub algorithm: HashAlgorithm,
    pub hash: String,
    #[serde(serialize_with = "serialize_ms")]
    pub processing_time: f64,
}
