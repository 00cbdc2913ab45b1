//!
//! 持久化测试：重启后密钥与操作历史保持不变
//!

mod common;

use common::test_config;
use seal_registry::error::{Error, ErrorKind, Result};
use seal_registry::service::{CryptoService, GenerateKeyRequest};
use seal_registry::storage::{JsonFilePersistence, RegistryPersistence, RegistrySnapshot};
use seal_registry::store::{KeyStatus, OperationType};
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::tempdir;

/// 可切换为写入失败的持久化后端，并检查每个写入快照的用量一致性
#[derive(Clone, Default)]
struct FlakyPersistence {
    failing: Arc<AtomicBool>,
    last: Arc<Mutex<Option<RegistrySnapshot>>>,
    inconsistent: Arc<AtomicUsize>,
}

impl FlakyPersistence {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn last_saved(&self) -> Option<RegistrySnapshot> {
        self.last.lock().unwrap().clone()
    }
}

fn usage_matches_log(snapshot: &RegistrySnapshot) -> bool {
    snapshot.keys.iter().all(|key| {
        let used = snapshot
            .operations
            .iter()
            .filter(|op| op.key_id.as_deref() == Some(key.metadata.key_id.as_str()))
            .filter(|op| op.success && op.operation_type.counts_as_usage())
            .count() as u64;
        key.metadata.usage_count == used
    })
}

impl RegistryPersistence for FlakyPersistence {
    fn load(&self) -> Result<Option<RegistrySnapshot>> {
        Ok(None)
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk full".to_string()));
        }
        if !usage_matches_log(snapshot) {
            self.inconsistent.fetch_add(1, Ordering::SeqCst);
        }
        *self.last.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}

fn open_at(path: &std::path::Path) -> CryptoService {
    CryptoService::open(&test_config(), Box::new(JsonFilePersistence::new(path))).unwrap()
}

#[test]
fn test_registry_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("registry.json");

    let (key_id, encrypted, signature) = {
        let service = open_at(&path);
        let key = service
            .generate_key(GenerateKeyRequest {
                label: Some("durable".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(key.stored_in_db);
        let encrypted = service.encrypt("kept across restarts", Some(&key.key_id)).unwrap();
        let signed = service.sign("kept across restarts", Some("durable")).unwrap();
        (key.key_id, encrypted.encrypted_data, signed.signature)
    };

    let service = open_at(&path);
    let key = service.get_key("durable").unwrap();
    assert_eq!(key.key_id, key_id);
    assert_eq!(key.usage_count, 2);
    assert_eq!(service.key_operations(&key_id, None).unwrap().len(), 3);

    // 重启后私钥仍可用
    assert_eq!(
        service.decrypt(&encrypted).unwrap().decrypted_data,
        "kept across restarts"
    );
    assert!(service
        .verify("kept across restarts", &signature, Some(&key_id))
        .unwrap()
        .valid);
}

#[test]
fn test_status_change_is_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("registry.json");

    let key_id = {
        let service = open_at(&path);
        let key = service.generate_key(GenerateKeyRequest::default()).unwrap();
        service.toggle_status(&key.key_id).unwrap();
        key.key_id
    };

    let service = open_at(&path);
    assert_eq!(service.get_key(&key_id).unwrap().status, KeyStatus::Inactive);
}

#[test]
fn test_default_key_is_reused_after_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("registry.json");

    let first = open_at(&path).sign("a", None).unwrap().key_id;
    let second = open_at(&path).sign("b", None).unwrap().key_id;
    assert_eq!(first, second);
}

#[test]
fn test_snapshot_never_exposes_keys_in_api_views() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("registry.json");
    let service = open_at(&path);
    let key = service.generate_key(GenerateKeyRequest::default()).unwrap();

    // 快照文件包含私钥材料，但 API 视图不包含
    let snapshot = JsonFilePersistence::new(&path).load().unwrap().unwrap();
    assert_eq!(snapshot.keys.len(), 1);

    let listing = serde_json::to_string(&service.list_keys().unwrap()).unwrap();
    assert!(listing.contains(&key.key_id));
    assert!(!listing.contains("private_key"));
    assert!(!listing.contains("material"));
}

#[test]
fn test_unreadable_snapshot_fails_open() {
    let dir = tempdir().unwrap();
    // 目标路径是一个目录，无法读取
    let path = dir.path().join("registry.json");
    fs::create_dir_all(&path).unwrap();

    let err = match CryptoService::open(&test_config(), Box::new(JsonFilePersistence::new(&path))) {
        Ok(_) => panic!("opening a directory as a snapshot should fail"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(err.public_message(), "storage error");
}

#[test]
fn test_failed_save_does_not_fail_committed_requests() {
    let backend = FlakyPersistence::default();
    let service = CryptoService::open(&test_config(), Box::new(backend.clone())).unwrap();
    let key_id = service
        .generate_key(GenerateKeyRequest::default())
        .unwrap()
        .key_id;
    assert!(service.storage_healthy());

    backend.set_failing(true);

    // 内存状态已提交，请求本身成功
    service.sign("while the disk is full", Some(&key_id)).unwrap();
    let key = service.get_key(&key_id).unwrap();
    assert_eq!(key.usage_count, 1);
    let latest = service.key_operations(&key_id, Some(1)).unwrap().remove(0);
    assert_eq!(latest.operation_type, OperationType::Signature);
    assert!(latest.success);

    let labelled = service
        .generate_key(GenerateKeyRequest {
            label: Some("lbl".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert!(!service.storage_healthy());

    // 重试同一标签会冲突，因为第一次已经成功
    let retry = service.generate_key(GenerateKeyRequest {
        label: Some("lbl".to_string()),
        ..Default::default()
    });
    assert!(matches!(retry, Err(Error::Conflict(_))));
    assert_eq!(service.get_key("lbl").unwrap().key_id, labelled.key_id);
    assert_eq!(service.statistics().unwrap().total_keys, 2);

    // 恢复后下一次写入包含此前的全部状态
    backend.set_failing(false);
    service.sign("after recovery", Some(&key_id)).unwrap();
    assert!(service.storage_healthy());
    let saved = backend.last_saved().unwrap();
    assert_eq!(saved.keys.len(), 2);
    let saved_key = saved
        .keys
        .iter()
        .find(|k| k.metadata.key_id == key_id)
        .unwrap();
    assert_eq!(saved_key.metadata.usage_count, 2);
}

#[test]
fn test_saved_snapshots_keep_usage_consistent_under_concurrency() {
    let backend = FlakyPersistence::default();
    let service = Arc::new(CryptoService::open(&test_config(), Box::new(backend.clone())).unwrap());
    let key_id = service
        .generate_key(GenerateKeyRequest::default())
        .unwrap()
        .key_id;

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let service = Arc::clone(&service);
            let key_id = key_id.clone();
            thread::spawn(move || {
                for j in 0..3 {
                    service.sign(&format!("{i}-{j}"), Some(&key_id)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(backend.inconsistent.load(Ordering::SeqCst), 0);
    let saved = backend.last_saved().unwrap();
    assert!(usage_matches_log(&saved));
    assert_eq!(service.get_key(&key_id).unwrap().usage_count, 18);
}

#[test]
fn test_memory_backend_is_never_written() {
    let service = common::memory_service();
    let key = service.generate_key(GenerateKeyRequest::default()).unwrap();
    assert!(!key.stored_in_db);
    service.sign("x", Some(&key.key_id)).unwrap();
    assert!(service.storage_healthy());
    assert!(!service.is_durable());
}
