//! # 加密操作门面
//!
//! [`CryptoService`] is the single entry point for key management and
//! cryptographic requests. Every request resolves an optional key reference
//! (key id or label, falling back to the default key), runs the primitive,
//! appends one [`Operation`] and updates the key's usage counters, then writes
//! a snapshot through the configured [`RegistryPersistence`].
//!
//! In-memory state is committed first. A failed snapshot write is logged and
//! reported by [`CryptoService::storage_healthy`], never by the request that
//! triggered it.
//!
//! All methods are synchronous and may block on RSA work; async callers should
//! run them on a blocking thread.

pub mod outcomes;

pub use outcomes::*;

use crate::asymmetric::envelope::{self, EnvelopeMode};
use crate::asymmetric::{AsymmetricCryptographicSystem, RsaCryptoSystem};
use crate::common::config::{CryptoConfig, RegistryConfig};
use crate::common::utils::{elapsed_ms, preview};
use crate::error::{Error, ErrorKind, Result};
use crate::hashing::{self, HashAlgorithm};
use crate::statistics::{self, RegistryStatistics};
use crate::storage::{
    JsonFilePersistence, MemoryPersistence, RegistryPersistence, RegistrySnapshot,
};
use crate::store::{
    KeyMetadata, KeyStatus, KeyStore, ManagedKey, NewOperation, Operation, OperationLog,
    OperationType,
};
use arc_swap::ArcSwapOption;
use base64::{Engine, engine::general_purpose};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Label carried by an automatically created default key.
pub const DEFAULT_KEY_LABEL: &str = "default";

/// Characters of a Base64 signature kept in operation records.
const SIGNATURE_PREVIEW_CHARS: usize = 50;

/// Result of the audited part of an operation.
struct Audited<T> {
    value: T,
    signature_preview: Option<String>,
    /// Overrides the success flag for reads that complete but report a negative result.
    success: bool,
}

impl<T> Audited<T> {
    fn ok(value: T) -> Self {
        Self {
            value,
            signature_preview: None,
            success: true,
        }
    }
}

pub struct CryptoService {
    config: CryptoConfig,
    operations_page_size: usize,
    keys: KeyStore,
    operations: OperationLog,
    persistence: Box<dyn RegistryPersistence>,
    /// Held shared while a change spans the key store and the log, exclusively while snapshotting.
    commit_lock: RwLock<()>,
    persist_lock: Mutex<()>,
    storage_healthy: AtomicBool,
    default_key: ArcSwapOption<String>,
    default_key_init: Mutex<()>,
}

impl CryptoService {
    /// Opens the registry with the backend named by `config.storage.data_file`.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let persistence: Box<dyn RegistryPersistence> = match &config.storage.data_file {
            Some(path) => Box::new(JsonFilePersistence::new(path)),
            None => Box::new(MemoryPersistence::new()),
        };
        Self::open(config, persistence)
    }

    /// Opens the registry, restoring any snapshot held by `persistence`.
    pub fn open(config: &RegistryConfig, persistence: Box<dyn RegistryPersistence>) -> Result<Self> {
        config.validate()?;

        let keys = KeyStore::new(config.crypto.supported_key_sizes.clone());
        let operations = match persistence.load()? {
            Some(snapshot) => {
                let key_count = snapshot.keys.len();
                for key in snapshot.keys {
                    keys.insert(key)?;
                }
                info!(
                    keys = key_count,
                    operations = snapshot.operations.len(),
                    "restored registry snapshot"
                );
                OperationLog::from_records(snapshot.operations)
            }
            None => OperationLog::new(),
        };

        if let Some(default_id) = &config.crypto.default_key_id {
            if keys.resolve_id(default_id).is_err() {
                warn!(key_id = %default_id, "configured default key does not exist yet");
            }
        }

        Ok(Self {
            config: config.crypto.clone(),
            operations_page_size: config.storage.operations_page_size,
            keys,
            operations,
            persistence,
            commit_lock: RwLock::new(()),
            persist_lock: Mutex::new(()),
            storage_healthy: AtomicBool::new(true),
            default_key: ArcSwapOption::from(
                config.crypto.default_key_id.clone().map(Arc::new),
            ),
            default_key_init: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    pub fn is_durable(&self) -> bool {
        self.persistence.is_durable()
    }

    /// `false` when the most recent snapshot write failed.
    pub fn storage_healthy(&self) -> bool {
        self.storage_healthy.load(Ordering::Acquire)
    }

    // ---- key management -------------------------------------------------

    pub fn generate_key(&self, request: GenerateKeyRequest) -> Result<GeneratedKey> {
        let key_size = request.key_size.unwrap_or(self.config.default_key_size);
        let start = Instant::now();
        let managed = self
            .keys
            .create(request.key_type, key_size, request.label.as_deref())?;
        let processing_time = elapsed_ms(start);
        let key = managed.metadata.clone();

        {
            let _commit = self.commit_lock.read().map_err(Error::poisoned)?;
            self.keys.insert(managed)?;
            self.operations.append(NewOperation {
                key_id: Some(key.key_id.clone()),
                operation_type: OperationType::KeyGeneration,
                data_hash: None,
                signature_preview: None,
                processing_time,
                success: true,
            })?;
        }
        self.persist();

        info!(
            key_id = %key.key_id,
            key_size,
            label = ?key.label,
            elapsed_ms = processing_time,
            "generated key"
        );
        Ok(GeneratedKey {
            key_id: key.key_id,
            key_type: key.key_type,
            key_size: key.key_size,
            key_label: key.label,
            stored_in_db: self.persistence.is_durable(),
            processing_time,
        })
    }

    pub fn get_key(&self, reference: &str) -> Result<KeyMetadata> {
        self.keys.resolve(reference)
    }

    pub fn list_keys(&self) -> Result<KeyListing> {
        let keys = self.keys.list();
        let operations = self.operations.all()?;
        let statistics = statistics::compute(&keys, &operations);
        Ok(KeyListing {
            keys: statistics::key_summaries(keys, &operations),
            statistics,
        })
    }

    /// Operations for a key, most recent first. `limit` defaults to the configured page size.
    pub fn key_operations(&self, reference: &str, limit: Option<usize>) -> Result<Vec<Operation>> {
        if limit == Some(0) {
            return Err(Error::InvalidInput("limit must be positive".to_string()));
        }
        let key_id = self.keys.resolve_id(reference)?;
        self.operations
            .list_for_key(&key_id, Some(limit.unwrap_or(self.operations_page_size)))
    }

    pub fn set_key_status(&self, reference: &str, status: KeyStatus) -> Result<KeyMetadata> {
        let key_id = self.keys.resolve_id(reference)?;
        let key = self.keys.set_status(&key_id, status)?;
        self.persist();
        info!(key_id = %key_id, status = status.as_str(), "key status set");
        Ok(key)
    }

    pub fn toggle_status(&self, reference: &str) -> Result<StatusChange> {
        let key_id = self.keys.resolve_id(reference)?;
        let key = self.keys.toggle_status(&key_id)?;
        self.persist();
        info!(key_id = %key_id, status = key.status.as_str(), "key status toggled");
        Ok(StatusChange {
            message: format!("key {} is now {}", key_id, key.status.as_str()),
            key_id,
            new_status: key.status,
        })
    }

    /// Makes `reference` the key used by requests that name none.
    pub fn set_default_key(&self, reference: &str) -> Result<KeyMetadata> {
        let key = self.keys.resolve(reference)?;
        self.default_key.store(Some(Arc::new(key.key_id.clone())));
        info!(key_id = %key.key_id, "default key changed");
        Ok(key)
    }

    /// The current default key, creating it first when allowed.
    pub fn default_key(&self) -> Result<KeyMetadata> {
        let key_id = self.default_key_id()?;
        self.keys.get(&key_id)
    }

    pub fn statistics(&self) -> Result<RegistryStatistics> {
        let operations = self.operations.all()?;
        Ok(statistics::compute(&self.keys.list(), &operations))
    }

    // ---- cryptographic operations ---------------------------------------

    /// RSA-PSS/SHA-256 signature over the UTF-8 bytes of `data`, Base64 encoded.
    pub fn sign(&self, data: &str, key_ref: Option<&str>) -> Result<SignOutcome> {
        require_data(data)?;
        let key = self.key_for_use(key_ref)?;
        let key_id = key.metadata.key_id.clone();

        let (signature, processing_time) = self.audited(
            &key_id,
            OperationType::Signature,
            Some(hashing::sha256_hex(data.as_bytes())),
            || {
                key.metadata.ensure_active()?;
                let signature = sign_base64(&key, data.as_bytes())?;
                Ok(Audited {
                    signature_preview: Some(preview(&signature, SIGNATURE_PREVIEW_CHARS)),
                    value: signature,
                    success: true,
                })
            },
        )?;

        Ok(SignOutcome {
            signature,
            key_id,
            processing_time,
        })
    }

    /// Checks a Base64 signature. A mismatch is reported as `valid: false`, not as an error.
    ///
    /// Inactive keys may still verify. Verification does not count as key usage.
    pub fn verify(&self, data: &str, signature: &str, key_ref: Option<&str>) -> Result<VerifyOutcome> {
        require_data(data)?;
        require_field("signature", signature)?;
        let key = self.key_for_use(key_ref)?;
        let key_id = key.metadata.key_id.clone();

        let (valid, processing_time) = self.audited(
            &key_id,
            OperationType::Verification,
            Some(hashing::sha256_hex(data.as_bytes())),
            || {
                let valid = verify_base64(&key, data.as_bytes(), signature)?;
                Ok(Audited {
                    value: valid,
                    signature_preview: Some(preview(signature.trim(), SIGNATURE_PREVIEW_CHARS)),
                    success: valid,
                })
            },
        )?;

        Ok(VerifyOutcome {
            valid,
            key_id,
            processing_time,
        })
    }

    /// Encrypts `data` and frames the result as `<key_id>:<base64>`.
    pub fn encrypt(&self, data: &str, key_ref: Option<&str>) -> Result<EncryptOutcome> {
        require_data(data)?;
        let key = self.key_for_use(key_ref)?;
        let key_id = key.metadata.key_id.clone();

        let (encrypted_data, processing_time) = self.audited(
            &key_id,
            OperationType::Encryption,
            Some(hashing::sha256_hex(data.as_bytes())),
            || {
                key.metadata.ensure_active()?;
                let (sealed, mode) = envelope::seal::<RsaCryptoSystem>(
                    key.public_key(),
                    data.as_bytes(),
                    key_id.as_bytes(),
                )?;
                if mode == EnvelopeMode::Hybrid {
                    debug!(key_id = %key_id, len = data.len(), "payload exceeds one RSA block, using hybrid envelope");
                }
                Ok(Audited::ok(format!(
                    "{}:{}",
                    key_id,
                    general_purpose::STANDARD.encode(sealed)
                )))
            },
        )?;

        Ok(EncryptOutcome {
            encrypted_data,
            key_id,
            processing_time,
        })
    }

    /// Reverses [`CryptoService::encrypt`]. The key is taken from the payload framing.
    pub fn decrypt(&self, encrypted_data: &str) -> Result<DecryptOutcome> {
        require_field("encrypted_data", encrypted_data)?;
        let (key_part, body) = encrypted_data
            .trim()
            .split_once(':')
            .ok_or_else(|| {
                Error::DecryptionFailed("payload is not in '<key_id>:<data>' form".to_string())
            })?;
        let key = self.keys.checkout(key_part)?;
        let key_id = key.metadata.key_id.clone();

        let (decrypted_data, processing_time) = self.audited(
            &key_id,
            OperationType::Decryption,
            Some(hashing::sha256_hex(encrypted_data.as_bytes())),
            || {
                key.metadata.ensure_active()?;
                let sealed = general_purpose::STANDARD.decode(body).map_err(|_| {
                    Error::DecryptionFailed("payload is not valid Base64".to_string())
                })?;
                let plaintext =
                    envelope::open::<RsaCryptoSystem>(key.private_key(), &sealed, key_id.as_bytes())
                        .map_err(|e| Error::DecryptionFailed(e.to_string()))?;
                Ok(Audited::ok(match String::from_utf8(plaintext) {
                    Ok(text) => text,
                    Err(err) => hex::encode(err.into_bytes()),
                }))
            },
        )?;

        Ok(DecryptOutcome {
            decrypted_data,
            key_id,
            processing_time,
        })
    }

    /// Hashes `data`, then signs the hex digest text.
    pub fn hash_and_sign(
        &self,
        data: &str,
        algorithm: Option<HashAlgorithm>,
        key_ref: Option<&str>,
    ) -> Result<HashAndSignOutcome> {
        require_data(data)?;
        let algorithm = algorithm.unwrap_or(self.config.default_hash_algorithm);
        let key = self.key_for_use(key_ref)?;
        let key_id = key.metadata.key_id.clone();

        let ((hash, signature, hash_time, sign_time), total_time) = self.audited(
            &key_id,
            OperationType::HashAndSign,
            Some(hashing::sha256_hex(data.as_bytes())),
            || {
                key.metadata.ensure_active()?;
                let hash_start = Instant::now();
                let hash = algorithm.hex_digest(data.as_bytes());
                let hash_time = elapsed_ms(hash_start);

                let sign_start = Instant::now();
                let signature = sign_base64(&key, hash.as_bytes())?;
                let sign_time = elapsed_ms(sign_start);

                Ok(Audited {
                    signature_preview: Some(preview(&signature, SIGNATURE_PREVIEW_CHARS)),
                    value: (hash, signature, hash_time, sign_time),
                    success: true,
                })
            },
        )?;

        Ok(HashAndSignOutcome {
            hash,
            hash_algorithm: algorithm,
            signature,
            key_id,
            performance: Performance {
                hash_time,
                sign_time,
                total_time,
            },
        })
    }

    /// Checks integrity (`expected_hash` against a fresh digest) and authenticity
    /// (`signature` over that digest). Both must hold for `valid`.
    pub fn verify_hash_signature(
        &self,
        data: &str,
        signature: &str,
        expected_hash: &str,
        algorithm: Option<HashAlgorithm>,
        key_ref: Option<&str>,
    ) -> Result<HashSignatureVerification> {
        require_data(data)?;
        require_field("signature", signature)?;
        require_field("expected_hash", expected_hash)?;
        let algorithm = algorithm.unwrap_or(self.config.default_hash_algorithm);
        let key = self.key_for_use(key_ref)?;
        let key_id = key.metadata.key_id.clone();

        let ((integrity_valid, signature_valid), _) = self.audited(
            &key_id,
            OperationType::HashVerification,
            Some(hashing::sha256_hex(data.as_bytes())),
            || {
                let integrity_valid = algorithm.verify_integrity(data.as_bytes(), expected_hash);
                let digest = algorithm.hex_digest(data.as_bytes());
                let signature_valid = verify_base64(&key, digest.as_bytes(), signature)?;
                Ok(Audited {
                    value: (integrity_valid, signature_valid),
                    signature_preview: Some(preview(signature.trim(), SIGNATURE_PREVIEW_CHARS)),
                    success: integrity_valid && signature_valid,
                })
            },
        )?;

        let message = match (integrity_valid, signature_valid) {
            (true, true) => "integrity and signature verified".to_string(),
            (false, true) => "integrity check failed: data does not match the expected hash".to_string(),
            (true, false) => "signature check failed: signature does not match the data hash".to_string(),
            (false, false) => "integrity and signature checks both failed".to_string(),
        };

        Ok(HashSignatureVerification {
            valid: integrity_valid && signature_valid,
            integrity_valid,
            signature_valid,
            message,
            key_id,
        })
    }

    /// Plain digest computation. Not recorded in the operation log.
    pub fn compute_hash(&self, data: &str, algorithm: Option<HashAlgorithm>) -> Result<HashOutcome> {
        require_data(data)?;
        let algorithm = algorithm.unwrap_or(self.config.default_hash_algorithm);
        let start = Instant::now();
        let hash = algorithm.hex_digest(data.as_bytes());
        Ok(HashOutcome {
            algorithm,
            hash,
            processing_time: elapsed_ms(start),
        })
    }

    // ---- internals --------------------------------------------------------

    fn key_for_use(&self, key_ref: Option<&str>) -> Result<ManagedKey> {
        match key_ref.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => self.keys.checkout(reference),
            None => {
                let key_id = self.default_key_id()?;
                self.keys.checkout(&key_id)
            }
        }
    }

    fn default_key_id(&self) -> Result<String> {
        if let Some(key_id) = self.default_key.load_full() {
            return self.keys.resolve_id(&key_id);
        }
        if !self.config.auto_create_default_key {
            return Err(Error::KeyNotFound(
                "no key_id given and no default key configured".to_string(),
            ));
        }

        let _guard = self.default_key_init.lock().map_err(Error::poisoned)?;
        if let Some(key_id) = self.default_key.load_full() {
            return self.keys.resolve_id(&key_id);
        }
        let key_id = match self.keys.resolve_id(DEFAULT_KEY_LABEL) {
            Ok(existing) => existing,
            Err(_) => {
                info!("creating default key");
                self.generate_key(GenerateKeyRequest {
                    label: Some(DEFAULT_KEY_LABEL.to_string()),
                    ..GenerateKeyRequest::default()
                })?
                .key_id
            }
        };
        self.default_key.store(Some(Arc::new(key_id.clone())));
        Ok(key_id)
    }

    /// Runs `action` against a resolved key, records the attempt and, on
    /// success, the key usage. Returns the value and the elapsed milliseconds.
    ///
    /// For operations that count as usage the key status is checked again when
    /// the use is recorded, so a key deactivated mid-request fails the request.
    fn audited<T, F>(
        &self,
        key_id: &str,
        operation_type: OperationType,
        data_hash: Option<String>,
        action: F,
    ) -> Result<(T, f64)>
    where
        F: FnOnce() -> Result<Audited<T>>,
    {
        let start = Instant::now();
        let outcome = action();
        let processing_time = elapsed_ms(start);

        let record = |success: bool, signature_preview: Option<String>| NewOperation {
            key_id: Some(key_id.to_string()),
            operation_type,
            data_hash: data_hash.clone(),
            signature_preview,
            processing_time,
            success,
        };

        let committed = {
            let _commit = self.commit_lock.read().map_err(Error::poisoned)?;
            match outcome {
                Ok(audited) if audited.success && operation_type.counts_as_usage() => {
                    let preview = audited.signature_preview.clone();
                    self.keys
                        .commit_usage(key_id, |active| {
                            let preview = if active { preview } else { None };
                            Ok(self.operations.append(record(active, preview))?.timestamp)
                        })
                        .map(|_| audited.value)
                }
                Ok(audited) => {
                    self.operations
                        .append(record(audited.success, audited.signature_preview.clone()))?;
                    Ok(audited.value)
                }
                Err(err) => {
                    self.operations.append(record(false, None))?;
                    Err(err)
                }
            }
        };
        self.persist();

        match committed {
            Ok(value) => {
                debug!(
                    key_id = %key_id,
                    operation = operation_type.as_str(),
                    elapsed_ms = processing_time,
                    "operation recorded"
                );
                Ok((value, processing_time))
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::Internal | ErrorKind::Storage => error!(
                        key_id = %key_id,
                        operation = operation_type.as_str(),
                        error = %err,
                        "operation failed"
                    ),
                    _ => warn!(
                        key_id = %key_id,
                        operation = operation_type.as_str(),
                        error = %err,
                        "operation rejected"
                    ),
                }
                Err(err)
            }
        }
    }

    /// Writes a snapshot to a durable backend. Failures are logged and flip
    /// [`CryptoService::storage_healthy`]; the in-memory state stays authoritative.
    fn persist(&self) {
        if !self.persistence.is_durable() {
            return;
        }
        if let Err(err) = self.try_persist() {
            self.storage_healthy.store(false, Ordering::Release);
            error!(error = %err, "failed to persist registry snapshot");
        } else {
            self.storage_healthy.store(true, Ordering::Release);
        }
    }

    fn try_persist(&self) -> Result<()> {
        let _persist = self.persist_lock.lock().map_err(Error::poisoned)?;
        let snapshot = {
            // 独占提交锁，保证密钥与操作记录来自同一时刻
            let _commit = self.commit_lock.write().map_err(Error::poisoned)?;
            RegistrySnapshot::new(self.keys.snapshot(), self.operations.all()?)
        };
        self.persistence.save(&snapshot)
    }
}

fn sign_base64(key: &ManagedKey, message: &[u8]) -> Result<String> {
    let signature = RsaCryptoSystem::sign(key.private_key(), message)?;
    Ok(general_purpose::STANDARD.encode(signature))
}

fn verify_base64(key: &ManagedKey, message: &[u8], signature: &str) -> Result<bool> {
    let signature = general_purpose::STANDARD
        .decode(signature.trim())
        .map_err(|_| Error::InvalidInput("signature is not valid Base64".to_string()))?;
    Ok(RsaCryptoSystem::verify(key.public_key(), message, &signature)?)
}

fn require_data(data: &str) -> Result<()> {
    require_field("data", data)
}

fn require_field(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{name} must not be empty")));
    }
    Ok(())
}
