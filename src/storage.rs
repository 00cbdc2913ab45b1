//! Registry persistence backends.
// 中文: 注册表持久化后端。

pub mod plaintext_store;
pub mod traits;

pub use plaintext_store::{JsonFilePersistence, MemoryPersistence};
pub use traits::{RegistryPersistence, RegistrySnapshot};
