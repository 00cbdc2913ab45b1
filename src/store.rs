//! 注册表存储：密钥仓库与操作日志
pub mod keys;
pub mod operations;

pub use keys::{KeyMetadata, KeyStatus, KeyStore, KeyType, ManagedKey};
pub use operations::{NewOperation, Operation, OperationLog, OperationType};
