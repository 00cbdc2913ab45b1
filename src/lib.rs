//! # Seal-Registry: key and operation registry
//!
//! `seal-registry` keeps RSA key pairs with their lifecycle status and usage
//! counters, runs signing, verification, encryption and hashing requests
//! against them, and records every attempt in an append-only operation log.
//! The same facade backs an HTTP/JSON API.
//!
//! ## Core Concepts
//!
//! - **`KeyStore`**: key pairs, labels, status and usage accounting.
//! - **`OperationLog`**: the audit trail of cryptographic operations.
//! - **`CryptoService`**: the facade that resolves keys, runs primitives and keeps the books.
//! - **`RegistryPersistence`**: where snapshots of the registry are kept.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seal_registry::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let service = CryptoService::from_config(&RegistryConfig::default())?;
//!
//!     let key = service.generate_key(GenerateKeyRequest::default())?;
//!     let signed = service.sign("Hello, registry!", Some(&key.key_id))?;
//!     let checked = service.verify("Hello, registry!", &signed.signature, Some(&key.key_id))?;
//!     assert!(checked.valid);
//!
//!     let stats = service.statistics()?;
//!     println!("{} operations, success rate {}", stats.total_operations, stats.success_rate);
//!     Ok(())
//! }
//! ```

pub mod asymmetric;
pub mod common;
pub mod demo;
pub mod error;
pub mod hashing;
pub mod server;
pub mod service;
pub mod statistics;
pub mod storage;
pub mod store;

/// Crate version, reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// --- Prelude ---
// A collection of the most commonly used types.
pub mod prelude {
    pub use crate::common::config::RegistryConfig;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::hashing::HashAlgorithm;
    pub use crate::service::{CryptoService, GenerateKeyRequest};
    pub use crate::statistics::RegistryStatistics;
    pub use crate::storage::{JsonFilePersistence, MemoryPersistence, RegistryPersistence};
    pub use crate::store::{KeyMetadata, KeyStatus, KeyType, Operation, OperationType};
}

pub use error::{Error, Result};
pub use service::CryptoService;
