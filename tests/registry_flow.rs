//!
//! 注册表端到端流程测试
//!
//! 覆盖用量计数、状态切换、哈希签名验证、统计与失败记录等核心性质。
//!

mod common;

use common::{memory_service, new_key};
use seal_registry::error::Error;
use seal_registry::hashing::HashAlgorithm;
use seal_registry::store::{KeyStatus, OperationType};
use std::sync::Arc;
use std::thread;

#[test]
fn test_usage_follows_successful_operations() {
    let service = memory_service();
    let k1 = new_key(&service, None);
    assert_eq!(service.get_key(&k1).unwrap().usage_count, 0);

    service.sign("payload", Some(&k1)).unwrap();
    let key = service.get_key(&k1).unwrap();
    assert_eq!(key.usage_count, 1);
    assert!(key.last_used.is_some());

    let ops = service.key_operations(&k1, None).unwrap();
    assert_eq!(
        ops.iter()
            .filter(|op| op.operation_type == OperationType::Signature)
            .count(),
        1
    );

    service.hash_and_sign("payload", None, Some(&k1)).unwrap();
    assert_eq!(service.get_key(&k1).unwrap().usage_count, 2);
}

#[test]
fn test_usage_count_matches_operation_log() {
    let service = memory_service();
    let k = new_key(&service, None);

    let signed = service.sign("a", Some(&k)).unwrap();
    service.verify("a", &signed.signature, Some(&k)).unwrap();
    let encrypted = service.encrypt("b", Some(&k)).unwrap();
    service.decrypt(&encrypted.encrypted_data).unwrap();
    let _ = service.decrypt(&format!("{k}:AAAA"));
    service.hash_and_sign("c", Some(HashAlgorithm::Sha512), Some(&k)).unwrap();

    let counted = service
        .key_operations(&k, Some(100))
        .unwrap()
        .into_iter()
        .filter(|op| op.success && op.operation_type.counts_as_usage())
        .count() as u64;
    assert_eq!(service.get_key(&k).unwrap().usage_count, counted);
    assert_eq!(counted, 4);
}

#[test]
fn test_last_used_matches_latest_operation() {
    let service = memory_service();
    let k = new_key(&service, None);
    service.sign("one", Some(&k)).unwrap();
    service.sign("two", Some(&k)).unwrap();

    let latest = service.key_operations(&k, Some(1)).unwrap().remove(0);
    assert_eq!(service.get_key(&k).unwrap().last_used, Some(latest.timestamp));
}

#[test]
fn test_toggle_twice_restores_status() {
    let service = memory_service();
    let k = new_key(&service, None);

    let first = service.toggle_status(&k).unwrap();
    assert_eq!(first.new_status, KeyStatus::Inactive);
    assert!(first.message.contains("inactive"));
    let second = service.toggle_status(&k).unwrap();
    assert_eq!(second.new_status, KeyStatus::Active);

    assert!(matches!(service.toggle_status("rsa-unknown"), Err(Error::KeyNotFound(_))));
}

#[test]
fn test_hash_signature_roundtrip_and_tamper() {
    let service = memory_service();
    let k = new_key(&service, None);
    let data = "The quick brown fox";

    let signed = service.hash_and_sign(data, None, Some(&k)).unwrap();
    assert_eq!(signed.hash_algorithm, HashAlgorithm::Sha256);
    let expected = HashAlgorithm::Sha256.hex_digest(data.as_bytes());
    assert_eq!(signed.hash, expected);

    let verdict = service
        .verify_hash_signature(data, &signed.signature, &expected, None, Some(&k))
        .unwrap();
    assert!(verdict.valid);

    let mut tampered = data.as_bytes().to_vec();
    tampered[0] ^= 0x01;
    let tampered = String::from_utf8(tampered).unwrap();
    let verdict = service
        .verify_hash_signature(&tampered, &signed.signature, &expected, None, Some(&k))
        .unwrap();
    assert!(!verdict.valid);
    assert!(verdict.message.contains("failed"));

    let ops = service.key_operations(&k, None).unwrap();
    assert_eq!(ops[0].operation_type, OperationType::HashVerification);
    assert!(!ops[0].success);
}

#[test]
fn test_hash_signature_reports_foreign_signature() {
    let service = memory_service();
    let signer = new_key(&service, None);
    let verifier = new_key(&service, None);
    let data = "ledger entry 42";

    let signed = service.hash_and_sign(data, None, Some(&signer)).unwrap();
    let verdict = service
        .verify_hash_signature(data, &signed.signature, &signed.hash, None, Some(&verifier))
        .unwrap();

    assert!(!verdict.valid);
    assert!(verdict.integrity_valid);
    assert!(!verdict.signature_valid);
    assert!(verdict.message.starts_with("signature check failed"));
}

#[test]
fn test_hash_signature_reports_wrong_expected_hash() {
    let service = memory_service();
    let k = new_key(&service, None);
    let data = "ledger entry 43";

    let signed = service.hash_and_sign(data, None, Some(&k)).unwrap();
    let wrong_hash = HashAlgorithm::Sha256.hex_digest(b"ledger entry 44");
    let verdict = service
        .verify_hash_signature(data, &signed.signature, &wrong_hash, None, Some(&k))
        .unwrap();

    assert!(!verdict.valid);
    assert!(!verdict.integrity_valid);
    assert!(verdict.signature_valid);
    assert!(verdict.message.starts_with("integrity check failed"));
}

#[test]
fn test_success_rate_is_zero_without_operations() {
    let service = memory_service();
    let stats = service.statistics().unwrap();
    assert_eq!(stats.total_operations, 0);
    assert_eq!(stats.success_rate, 0.0);
    assert_eq!(stats.avg_processing_time, 0.0);
}

#[test]
fn test_inactive_key_refuses_new_operations() {
    let service = memory_service();
    let k = new_key(&service, None);
    service.toggle_status(&k).unwrap();

    assert!(matches!(service.sign("x", Some(&k)), Err(Error::KeyInactive(_))));
    assert!(matches!(service.encrypt("x", Some(&k)), Err(Error::KeyInactive(_))));
    assert!(matches!(
        service.hash_and_sign("x", None, Some(&k)),
        Err(Error::KeyInactive(_))
    ));

    let key = service.get_key(&k).unwrap();
    assert_eq!(key.usage_count, 0);
    let ops = service.key_operations(&k, None).unwrap();
    assert!(ops
        .iter()
        .filter(|op| op.operation_type != OperationType::KeyGeneration)
        .all(|op| !op.success));
    assert_eq!(ops.len(), 4);
}

#[test]
fn test_inactive_key_can_still_verify() {
    let service = memory_service();
    let k = new_key(&service, None);
    let signed = service.sign("archived", Some(&k)).unwrap();
    service.toggle_status(&k).unwrap();

    assert!(service.verify("archived", &signed.signature, Some(&k)).unwrap().valid);
}

#[test]
fn test_decrypting_foreign_data_fails_cleanly() {
    let service = memory_service();
    let k = new_key(&service, None);
    let other = new_key(&service, None);

    // 用另一个密钥的 ID 重新封装密文；混合信封绑定了原密钥 ID
    let encrypted = service.encrypt(&"secret".repeat(100), Some(&k)).unwrap();
    let body = encrypted.encrypted_data.split_once(':').unwrap().1;
    let forged = format!("{other}:{body}");

    assert!(matches!(service.decrypt(&forged), Err(Error::DecryptionFailed(_))));
    assert!(matches!(service.decrypt("not framed"), Err(Error::DecryptionFailed(_))));
    assert_eq!(service.get_key(&other).unwrap().usage_count, 0);
}

#[test]
fn test_label_addresses_key_for_encryption() {
    let service = memory_service();
    let k = new_key(&service, Some("archive"));

    let encrypted = service.encrypt("plain text", Some("archive")).unwrap();
    assert_eq!(encrypted.key_id, k);
    assert_eq!(
        service.decrypt(&encrypted.encrypted_data).unwrap().decrypted_data,
        "plain text"
    );
}

#[test]
fn test_duplicate_label_is_a_conflict() {
    let service = memory_service();
    new_key(&service, Some("team"));
    let result = service.generate_key(seal_registry::service::GenerateKeyRequest {
        label: Some("team".to_string()),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[test]
fn test_unsupported_key_size_is_rejected() {
    let service = memory_service();
    let result = service.generate_key(seal_registry::service::GenerateKeyRequest {
        key_size: Some(768),
        ..Default::default()
    });
    assert!(matches!(result, Err(Error::InvalidParameter(_))));
}

#[test]
fn test_concurrent_signing_loses_no_updates() {
    let service = Arc::new(memory_service());
    let k = new_key(&service, None);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            let k = k.clone();
            thread::spawn(move || {
                for j in 0..3 {
                    service.sign(&format!("message {i}-{j}"), Some(&k)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(service.get_key(&k).unwrap().usage_count, 24);
    assert_eq!(service.statistics().unwrap().total_operations, 25);
}

#[test]
fn test_list_includes_statistics_and_per_key_totals() {
    let service = memory_service();
    let k = new_key(&service, None);
    service.sign("x", Some(&k)).unwrap();

    let listing = service.list_keys().unwrap();
    assert_eq!(listing.keys.len(), 1);
    assert_eq!(listing.keys[0].total_operations, 2);
    assert_eq!(listing.statistics.total_keys, 1);
    assert_eq!(listing.statistics.successful_operations, 2);
}
