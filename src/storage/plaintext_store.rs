//! Persistence implementations for `RegistryPersistence`.
// 中文: `RegistryPersistence` 的实现：内存与明文 JSON 文件。

use super::traits::{RegistryPersistence, RegistrySnapshot, SNAPSHOT_VERSION};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Backend for registries that live only as long as the process.
///
/// The service never saves through a non-durable backend, so nothing is kept here.
///
/// 中文: 仅存在于进程生命周期内的注册表后端，不保存任何快照。
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryPersistence;

impl MemoryPersistence {
    pub fn new() -> Self {
        Self
    }
}

impl RegistryPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<RegistrySnapshot>> {
        Ok(None)
    }

    fn save(&self, _snapshot: &RegistrySnapshot) -> Result<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// A persistence strategy that saves and loads the registry as a plaintext JSON file.
///
/// Private keys are written unencrypted, so the file must live on storage the
/// operator already trusts.
///
/// Each save rewrites the whole file, so its cost grows linearly with the
/// number of keys and recorded operations.
///
/// 中文: 一个将注册表保存和加载为明文 JSON 文件的持久化策略。私钥以明文写入。
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<RegistrySnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let payload_json = fs::read_to_string(&self.path)?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&payload_json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Storage(format!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            )));
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let payload_json = serde_json::to_string_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Atomic write to prevent data corruption if the write is interrupted.
        // 中文: 原子写入，防止在写入中断时数据损坏。
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, payload_json)?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}
