//! 通用模块，包含配置与工具函数

pub mod config;
pub mod utils;

pub use self::config::{CryptoConfig, RegistryConfig, ServerConfig, StorageConfig};
pub use self::utils::{ZeroizingVec, constant_time_eq};
