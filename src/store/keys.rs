//! # 密钥仓库
//!
//! `KeyStore` owns every key pair the registry knows about. Keys are held in a
//! sharded map so mutations of one key never block another; label uniqueness
//! is enforced through a second map. When both maps are touched, the labels
//! map is entered first.

use crate::asymmetric::{
    AsymmetricCryptographicSystem, RsaCryptoSystem, RsaPrivateKeyWrapper, RsaPublicKeyWrapper,
};
use crate::common::utils::preview;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Characters of the PEM public key shown in listings.
const PUBLIC_KEY_PREVIEW_CHARS: usize = 100;

/// 密钥算法族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "RSA")]
    Rsa,
}

impl KeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyType::Rsa => "RSA",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            KeyType::Rsa => "rsa",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "RSA" | "RSA_PKCS" => Ok(KeyType::Rsa),
            _ => Err(Error::InvalidInput(format!("unsupported key type '{}'", s.trim()))),
        }
    }
}

/// 密钥状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Inactive,
}

impl KeyStatus {
    pub fn toggled(self) -> Self {
        match self {
            KeyStatus::Active => KeyStatus::Inactive,
            KeyStatus::Inactive => KeyStatus::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Inactive => "inactive",
        }
    }
}

/// 密钥的公开元数据，不包含私钥
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub key_id: String,
    pub key_type: KeyType,
    pub key_size: usize,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub public_key_preview: String,
    pub label: Option<String>,
}

impl KeyMetadata {
    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }

    /// Fails with `KeyInactive` unless the key may be used for new operations.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::KeyInactive(self.key_id.clone()))
        }
    }
}

/// 密钥对材料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMaterial {
    pub(crate) public_key: RsaPublicKeyWrapper,
    pub(crate) private_key: RsaPrivateKeyWrapper,
}

/// A key record together with its material, as held by the store and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedKey {
    pub metadata: KeyMetadata,
    pub(crate) material: KeyMaterial,
}

impl ManagedKey {
    pub(crate) fn public_key(&self) -> &RsaPublicKeyWrapper {
        &self.material.public_key
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKeyWrapper {
        &self.material.private_key
    }
}

/// 密钥仓库
pub struct KeyStore {
    keys: DashMap<String, ManagedKey>,
    /// label -> key_id
    labels: DashMap<String, String>,
    supported_sizes: Vec<usize>,
}

impl KeyStore {
    pub fn new(supported_sizes: Vec<usize>) -> Self {
        Self {
            keys: DashMap::new(),
            labels: DashMap::new(),
            supported_sizes,
        }
    }

    pub fn supported_sizes(&self) -> &[usize] {
        &self.supported_sizes
    }

    /// Generates and stores a new active key pair.
    ///
    /// Blocks for the duration of RSA key generation.
    pub fn generate(
        &self,
        key_type: KeyType,
        key_size: usize,
        label: Option<&str>,
    ) -> Result<KeyMetadata> {
        let managed = self.create(key_type, key_size, label)?;
        let metadata = managed.metadata.clone();
        self.insert(managed)?;
        Ok(metadata)
    }

    /// Generates a new active key pair without storing it.
    ///
    /// The label is checked against the store now and again by [`KeyStore::insert`].
    pub fn create(
        &self,
        key_type: KeyType,
        key_size: usize,
        label: Option<&str>,
    ) -> Result<ManagedKey> {
        if !self.supported_sizes.contains(&key_size) {
            return Err(Error::InvalidParameter(format!(
                "key size {} is not supported (expected one of {:?})",
                key_size, self.supported_sizes
            )));
        }
        let label = normalize_label(label);
        if let Some(label) = &label {
            self.check_label_free(label)?;
        }

        let (public_key, private_key) = match key_type {
            KeyType::Rsa => RsaCryptoSystem::generate_keypair(key_size)?,
        };
        let pem = RsaCryptoSystem::export_public_key(&public_key)?;

        let key_id = format!("{}-{}", key_type.id_prefix(), Uuid::new_v4().simple());
        let managed = ManagedKey {
            metadata: KeyMetadata {
                key_id: key_id.clone(),
                key_type,
                key_size,
                status: KeyStatus::Active,
                created_at: Utc::now(),
                last_used: None,
                usage_count: 0,
                public_key_preview: preview(&pem, PUBLIC_KEY_PREVIEW_CHARS),
                label,
            },
            material: KeyMaterial {
                public_key,
                private_key,
            },
        };
        Ok(managed)
    }

    /// Adds an existing key, enforcing id and label uniqueness.
    pub fn insert(&self, managed: ManagedKey) -> Result<()> {
        let key_id = managed.metadata.key_id.clone();
        match managed.metadata.label.clone() {
            Some(label) => {
                if self.keys.contains_key(&label) {
                    return Err(label_conflict(&label));
                }
                match self.labels.entry(label) {
                    Entry::Occupied(entry) => Err(label_conflict(entry.key())),
                    Entry::Vacant(entry) => {
                        self.insert_key(managed)?;
                        entry.insert(key_id);
                        Ok(())
                    }
                }
            }
            None => self.insert_key(managed),
        }
    }

    fn insert_key(&self, managed: ManagedKey) -> Result<()> {
        match self.keys.entry(managed.metadata.key_id.clone()) {
            Entry::Occupied(entry) => Err(Error::Conflict(format!(
                "key id '{}' already exists",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(managed);
                Ok(())
            }
        }
    }

    fn check_label_free(&self, label: &str) -> Result<()> {
        if self.labels.contains_key(label) || self.keys.contains_key(label) {
            return Err(label_conflict(label));
        }
        Ok(())
    }

    pub fn get(&self, key_id: &str) -> Result<KeyMetadata> {
        self.keys
            .get(key_id)
            .map(|entry| entry.metadata.clone())
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))
    }

    /// Resolves a key id or a label to the key id it names.
    pub fn resolve_id(&self, reference: &str) -> Result<String> {
        let reference = reference.trim();
        if self.keys.contains_key(reference) {
            return Ok(reference.to_string());
        }
        self.labels
            .get(reference)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::KeyNotFound(reference.to_string()))
    }

    /// Looks a key up by id or label.
    pub fn resolve(&self, reference: &str) -> Result<KeyMetadata> {
        let key_id = self.resolve_id(reference)?;
        self.get(&key_id)
    }

    /// Clones the full record, private material included.
    pub(crate) fn checkout(&self, reference: &str) -> Result<ManagedKey> {
        let key_id = self.resolve_id(reference)?;
        self.keys
            .get(&key_id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::KeyNotFound(key_id))
    }

    /// Newest first; ties broken by key id.
    pub fn list(&self) -> Vec<KeyMetadata> {
        let mut keys: Vec<KeyMetadata> = self
            .keys
            .iter()
            .map(|entry| entry.metadata.clone())
            .collect();
        keys.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.key_id.cmp(&b.key_id))
        });
        keys
    }

    pub fn set_status(&self, key_id: &str, status: KeyStatus) -> Result<KeyMetadata> {
        let mut entry = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        entry.metadata.status = status;
        Ok(entry.metadata.clone())
    }

    pub fn toggle_status(&self, key_id: &str) -> Result<KeyMetadata> {
        let mut entry = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        entry.metadata.status = entry.metadata.status.toggled();
        Ok(entry.metadata.clone())
    }

    /// Counts one successful use of the key.
    pub fn record_usage(&self, key_id: &str, at: DateTime<Utc>) -> Result<KeyMetadata> {
        let mut entry = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        entry.metadata.usage_count += 1;
        entry.metadata.last_used = Some(match entry.metadata.last_used {
            Some(previous) if previous > at => previous,
            _ => at,
        });
        Ok(entry.metadata.clone())
    }

    /// Records one use of `key_id` with its audit record, under the key's entry lock.
    ///
    /// `append` receives whether the key is still active and returns the
    /// timestamp of the record it wrote. The use is only counted for an active
    /// key; otherwise the call fails with `KeyInactive` after `append` ran.
    pub(crate) fn commit_usage<F>(&self, key_id: &str, append: F) -> Result<KeyMetadata>
    where
        F: FnOnce(bool) -> Result<DateTime<Utc>>,
    {
        let mut entry = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        let active = entry.metadata.is_active();
        let at = append(active)?;
        if !active {
            return Err(Error::KeyInactive(key_id.to_string()));
        }
        entry.metadata.usage_count += 1;
        entry.metadata.last_used = Some(match entry.metadata.last_used {
            Some(previous) if previous > at => previous,
            _ => at,
        });
        Ok(entry.metadata.clone())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.keys.iter().filter(|entry| entry.metadata.is_active()).count()
    }

    pub(crate) fn snapshot(&self) -> Vec<ManagedKey> {
        let mut keys: Vec<ManagedKey> = self.keys.iter().map(|entry| entry.value().clone()).collect();
        keys.sort_by(|a, b| a.metadata.created_at.cmp(&b.metadata.created_at));
        keys
    }
}

fn normalize_label(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

fn label_conflict(label: &str) -> Error {
    Error::Conflict(format!("label '{label}' is already in use"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KeyStore {
        KeyStore::new(vec![1024])
    }

    #[test]
    fn generate_creates_active_unused_key() {
        let store = store();
        let key = store.generate(KeyType::Rsa, 1024, Some("  signing  ")).unwrap();

        assert!(key.key_id.starts_with("rsa-"));
        assert_eq!(key.status, KeyStatus::Active);
        assert_eq!(key.usage_count, 0);
        assert!(key.last_used.is_none());
        assert_eq!(key.label.as_deref(), Some("signing"));
        assert!(key.public_key_preview.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(key.public_key_preview.ends_with("..."));
        assert_eq!(key.public_key_preview.chars().count(), 103);
        assert_eq!(store.resolve("signing").unwrap().key_id, key.key_id);
    }

    #[test]
    fn unsupported_size_is_rejected() {
        let store = store();
        assert!(matches!(
            store.generate(KeyType::Rsa, 1000, None),
            Err(Error::InvalidParameter(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn blank_label_counts_as_absent() {
        let store = store();
        let a = store.generate(KeyType::Rsa, 1024, Some("   ")).unwrap();
        let b = store.generate(KeyType::Rsa, 1024, Some("")).unwrap();
        assert!(a.label.is_none() && b.label.is_none());
    }

    #[test]
    fn duplicate_label_conflicts() {
        let store = store();
        let first = store.generate(KeyType::Rsa, 1024, Some("main")).unwrap();
        assert!(matches!(
            store.generate(KeyType::Rsa, 1024, Some("main")),
            Err(Error::Conflict(_))
        ));
        // 标签不能与已有的密钥 ID 相同
        assert!(matches!(
            store.generate(KeyType::Rsa, 1024, Some(&first.key_id)),
            Err(Error::Conflict(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn toggle_twice_restores_status() {
        let store = store();
        let key = store.generate(KeyType::Rsa, 1024, None).unwrap();

        assert_eq!(store.toggle_status(&key.key_id).unwrap().status, KeyStatus::Inactive);
        assert_eq!(store.toggle_status(&key.key_id).unwrap().status, KeyStatus::Active);
        assert!(matches!(store.toggle_status("rsa-missing"), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn set_status_is_idempotent() {
        let store = store();
        let key = store.generate(KeyType::Rsa, 1024, None).unwrap();
        store.set_status(&key.key_id, KeyStatus::Inactive).unwrap();
        let again = store.set_status(&key.key_id, KeyStatus::Inactive).unwrap();
        assert_eq!(again.status, KeyStatus::Inactive);
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn record_usage_counts_and_stamps() {
        let store = store();
        let key = store.generate(KeyType::Rsa, 1024, None).unwrap();
        let now = Utc::now();

        store.record_usage(&key.key_id, now).unwrap();
        let updated = store.record_usage(&key.key_id, now).unwrap();
        assert_eq!(updated.usage_count, 2);
        assert_eq!(updated.last_used, Some(now));
        assert!(matches!(store.record_usage("nope", now), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn create_does_not_store() {
        let store = store();
        let managed = store.create(KeyType::Rsa, 1024, Some("later")).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.resolve_id("later"), Err(Error::KeyNotFound(_))));

        store.insert(managed).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.resolve_id("later").is_ok());
    }

    #[test]
    fn commit_usage_rechecks_status_under_the_entry_lock() {
        let store = store();
        let key = store.generate(KeyType::Rsa, 1024, None).unwrap();
        let now = Utc::now();

        let updated = store
            .commit_usage(&key.key_id, |active| {
                assert!(active);
                Ok(now)
            })
            .unwrap();
        assert_eq!(updated.usage_count, 1);
        assert_eq!(updated.last_used, Some(now));

        store.set_status(&key.key_id, KeyStatus::Inactive).unwrap();
        let mut seen = None;
        let result = store.commit_usage(&key.key_id, |active| {
            seen = Some(active);
            Ok(Utc::now())
        });
        assert_eq!(seen, Some(false));
        assert!(matches!(result, Err(Error::KeyInactive(_))));
        assert_eq!(store.get(&key.key_id).unwrap().usage_count, 1);
    }

    #[test]
    fn list_is_newest_first() {
        let store = store();
        let older = store.generate(KeyType::Rsa, 1024, None).unwrap();
        let newer = store.generate(KeyType::Rsa, 1024, None).unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|k| k.key_id).collect();
        if newer.created_at == older.created_at {
            let mut sorted = vec![older.key_id, newer.key_id];
            sorted.sort();
            assert_eq!(ids, sorted);
        } else {
            assert_eq!(ids, vec![newer.key_id, older.key_id]);
        }
    }

    #[test]
    fn key_type_aliases() {
        assert_eq!("rsa".parse::<KeyType>().unwrap(), KeyType::Rsa);
        assert_eq!("RSA_PKCS".parse::<KeyType>().unwrap(), KeyType::Rsa);
        assert!("ecdsa".parse::<KeyType>().is_err());
        assert_eq!(serde_json::to_string(&KeyStatus::Inactive).unwrap(), "\"inactive\"");
    }
}
