//! 操作日志：只追加的加密操作记录
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    KeyGeneration,
    Signature,
    Verification,
    Encryption,
    Decryption,
    HashAndSign,
    HashVerification,
}

impl OperationType {
    /// Whether a successful operation of this type counts as a key use.
    pub fn counts_as_usage(self) -> bool {
        matches!(
            self,
            OperationType::Signature
                | OperationType::Encryption
                | OperationType::Decryption
                | OperationType::HashAndSign
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::KeyGeneration => "key_generation",
            OperationType::Signature => "signature",
            OperationType::Verification => "verification",
            OperationType::Encryption => "encryption",
            OperationType::Decryption => "decryption",
            OperationType::HashAndSign => "hash_and_sign",
            OperationType::HashVerification => "hash_verification",
        }
    }
}

/// 待追加的操作
#[derive(Debug, Clone)]
pub struct NewOperation {
    pub key_id: Option<String>,
    pub operation_type: OperationType,
    pub data_hash: Option<String>,
    pub signature_preview: Option<String>,
    pub processing_time: f64,
    pub success: bool,
}

/// 已记录的操作，不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: Uuid,
    pub key_id: Option<String>,
    pub operation_type: OperationType,
    pub data_hash: Option<String>,
    pub signature_preview: Option<String>,
    /// Milliseconds.
    pub processing_time: f64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
pub struct OperationLog {
    entries: RwLock<Vec<Operation>>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from persisted records, oldest first.
    pub fn from_records(mut records: Vec<Operation>) -> Self {
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self {
            entries: RwLock::new(records),
        }
    }

    /// Appends a record, assigning its id and a timestamp no earlier than the previous one.
    pub fn append(&self, record: NewOperation) -> Result<Operation> {
        let mut entries = self.entries.write().map_err(Error::poisoned)?;
        let now = Utc::now();
        let timestamp = match entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        let operation = Operation {
            operation_id: Uuid::new_v4(),
            key_id: record.key_id,
            operation_type: record.operation_type,
            data_hash: record.data_hash,
            signature_preview: record.signature_preview,
            processing_time: record.processing_time,
            success: record.success,
            timestamp,
        };
        entries.push(operation.clone());
        Ok(operation)
    }

    /// Operations referencing `key_id`, most recent first.
    pub fn list_for_key(&self, key_id: &str, limit: Option<usize>) -> Result<Vec<Operation>> {
        let entries = self.entries.read().map_err(Error::poisoned)?;
        Ok(entries
            .iter()
            .rev()
            .filter(|op| op.key_id.as_deref() == Some(key_id))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    /// Every operation, oldest first.
    pub fn all(&self) -> Result<Vec<Operation>> {
        Ok(self.entries.read().map_err(Error::poisoned)?.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(Error::poisoned)?.len())
    }
}
