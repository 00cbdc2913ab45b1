//! Traits for abstracting registry persistence.
// 中文: 用于抽象注册表持久化的 Trait。

use crate::error::Result;
use crate::store::{ManagedKey, Operation};
use serde::{Deserialize, Serialize};

/// Current on-disk format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the registry persists: keys with their material, and the operation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u32,
    pub keys: Vec<ManagedKey>,
    pub operations: Vec<Operation>,
}

impl RegistrySnapshot {
    pub fn new(keys: Vec<ManagedKey>, operations: Vec<Operation>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            keys,
            operations,
        }
    }
}

/// Defines the interface for registry persistence.
///
/// The service reads a snapshot back on startup and, for durable backends,
/// writes a full snapshot after every mutation. Implementations only need to
/// make each `save` atomic.
///
/// 中文: 定义了注册表持久化的通用接口。服务在启动时读取快照；对持久化后端，每次变更后写入完整快照。
pub trait RegistryPersistence: Send + Sync + 'static {
    /// Returns the last saved snapshot, or `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<RegistrySnapshot>>;

    /// Replaces the stored snapshot.
    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()>;

    /// Returns `true` if saved snapshots survive a process restart.
    fn is_durable(&self) -> bool;
}
