//!
//! # 通用配置模块
//!
//! Configuration for the registry: cryptographic defaults, persistence and the
//! HTTP listener. A [`RegistryConfig`] is assembled in layers: built-in
//! defaults, then an optional JSON file, then `SEAL_REGISTRY_*` environment
//! variables. The binary applies command-line flags last.
//!
use crate::error::{Error, Result};
use crate::hashing::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "SEAL_REGISTRY_";

/// 加密配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CryptoConfig {
    /// Key size used when a generate request omits `key_size`.
    pub default_key_size: usize,
    /// Key sizes accepted by `generate`.
    pub supported_key_sizes: Vec<usize>,
    /// Key used by sign/encrypt/hash-and-sign requests without a `key_id`.
    pub default_key_id: Option<String>,
    /// Create a default key on first use when `default_key_id` is unset.
    pub auto_create_default_key: bool,
    /// Digest used when a request omits `algorithm`.
    pub default_hash_algorithm: HashAlgorithm,
    /// Iterations per algorithm for `/benchmark/hash-algorithms`.
    pub hash_benchmark_iterations: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            default_key_size: 2048,
            supported_key_sizes: vec![1024, 2048, 3072, 4096],
            default_key_id: None,
            auto_create_default_key: true,
            default_hash_algorithm: HashAlgorithm::Sha256,
            hash_benchmark_iterations: 100,
        }
    }
}

/// 存储配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding keys and operation history. `None` keeps everything in memory.
    pub data_file: Option<PathBuf>,
    /// Number of operations returned by `/api/keys/{id}/operations` when no limit is given.
    pub operations_page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            operations_page_size: 20,
        }
    }
}

/// 服务配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// 完整配置文件
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct RegistryConfig {
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl RegistryConfig {
    /// Reads a JSON configuration file. Missing sections fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Builds the configuration from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies `SEAL_REGISTRY_*` overrides through `lookup`.
    ///
    /// Taking the lookup as a closure keeps this testable without touching the
    /// real process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(value) = var("HOST") {
            self.server.host = value;
        }
        if let Some(value) = var("PORT") {
            self.server.port = parse_env("PORT", &value)?;
        }
        if let Some(value) = var("DATA_FILE") {
            self.storage.data_file = (!value.trim().is_empty()).then(|| PathBuf::from(value));
        }
        if let Some(value) = var("DEFAULT_KEY_SIZE") {
            self.crypto.default_key_size = parse_env("DEFAULT_KEY_SIZE", &value)?;
        }
        if let Some(value) = var("DEFAULT_KEY_ID") {
            self.crypto.default_key_id = (!value.trim().is_empty()).then(|| value.trim().to_string());
        }
        if let Some(value) = var("AUTO_CREATE_DEFAULT_KEY") {
            self.crypto.auto_create_default_key = value.eq_ignore_ascii_case("true") || value == "1";
        }
        if let Some(value) = var("DEFAULT_HASH_ALGORITHM") {
            self.crypto.default_hash_algorithm = value.parse()?;
        }
        Ok(())
    }

    /// Rejects configurations the service cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.crypto.supported_key_sizes.is_empty() {
            return Err(Error::Configuration(
                "crypto.supported_key_sizes must not be empty".to_string(),
            ));
        }
        if !self
            .crypto
            .supported_key_sizes
            .contains(&self.crypto.default_key_size)
        {
            return Err(Error::Configuration(format!(
                "crypto.default_key_size {} is not one of {:?}",
                self.crypto.default_key_size, self.crypto.supported_key_sizes
            )));
        }
        if self.storage.operations_page_size == 0 {
            return Err(Error::Configuration(
                "storage.operations_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::Configuration(format!("{ENV_PREFIX}{name} has an invalid value '{value}'"))
    })
}
