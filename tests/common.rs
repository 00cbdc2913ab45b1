//!
//! 集成测试的通用辅助函数
//!
#![allow(dead_code)]

use seal_registry::common::config::RegistryConfig;
use seal_registry::service::{CryptoService, GenerateKeyRequest};
use seal_registry::storage::MemoryPersistence;
use seal_registry::store::KeyType;

/// 测试用的配置：只允许 1024 位密钥，生成更快
pub fn test_config() -> RegistryConfig {
    let mut config = RegistryConfig::default();
    config.crypto.supported_key_sizes = vec![1024];
    config.crypto.default_key_size = 1024;
    config.crypto.hash_benchmark_iterations = 2;
    config
}

pub fn memory_service() -> CryptoService {
    CryptoService::open(&test_config(), Box::new(MemoryPersistence::new())).unwrap()
}

/// 生成一个密钥并返回其 ID
pub fn new_key(service: &CryptoService, label: Option<&str>) -> String {
    service
        .generate_key(GenerateKeyRequest {
            key_type: KeyType::Rsa,
            key_size: Some(1024),
            label: label.map(str::to_string),
        })
        .unwrap()
        .key_id
}
