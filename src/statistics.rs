//! 统计汇总，由密钥仓库与操作日志派生
use crate::store::{KeyMetadata, Operation, OperationType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationTypeStatistics {
    pub count: usize,
    pub successful: usize,
    /// Milliseconds.
    pub avg_processing_time: f64,
}

/// 注册表统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryStatistics {
    pub total_keys: usize,
    pub active_keys: usize,
    pub total_operations: usize,
    pub successful_operations: usize,
    /// successful / total, in `[0, 1]`; `0` without operations.
    pub success_rate: f64,
    /// Mean milliseconds over all operations; `0` without operations.
    pub avg_processing_time: f64,
    pub by_operation_type: BTreeMap<OperationType, OperationTypeStatistics>,
}

pub fn compute(keys: &[KeyMetadata], operations: &[Operation]) -> RegistryStatistics {
    let total_operations = operations.len();
    let successful_operations = operations.iter().filter(|op| op.success).count();

    let mut by_operation_type: BTreeMap<OperationType, OperationTypeStatistics> = BTreeMap::new();
    let mut time_sums: BTreeMap<OperationType, f64> = BTreeMap::new();
    for op in operations {
        let entry = by_operation_type.entry(op.operation_type).or_default();
        entry.count += 1;
        if op.success {
            entry.successful += 1;
        }
        *time_sums.entry(op.operation_type).or_default() += op.processing_time;
    }
    for (operation_type, stats) in by_operation_type.iter_mut() {
        stats.avg_processing_time = mean(time_sums[operation_type], stats.count);
    }

    RegistryStatistics {
        total_keys: keys.len(),
        active_keys: keys.iter().filter(|k| k.is_active()).count(),
        total_operations,
        successful_operations,
        success_rate: ratio(successful_operations, total_operations),
        avg_processing_time: mean(
            operations.iter().map(|op| op.processing_time).sum(),
            total_operations,
        ),
        by_operation_type,
    }
}

/// A key listing row: the key plus its operation totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySummary {
    #[serde(flatten)]
    pub key: KeyMetadata,
    pub total_operations: usize,
    pub avg_processing_time: f64,
}

/// Joins each key with the operations that reference it. Order of `keys` is kept.
pub fn key_summaries(keys: Vec<KeyMetadata>, operations: &[Operation]) -> Vec<KeySummary> {
    let mut per_key: HashMap<&str, (usize, f64)> = HashMap::new();
    for op in operations {
        if let Some(key_id) = op.key_id.as_deref() {
            let entry = per_key.entry(key_id).or_default();
            entry.0 += 1;
            entry.1 += op.processing_time;
        }
    }

    keys.into_iter()
        .map(|key| {
            let (count, total) = per_key.get(key.key_id.as_str()).copied().unwrap_or_default();
            KeySummary {
                key,
                total_operations: count,
                avg_processing_time: mean(total, count),
            }
        })
        .collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyStatus, KeyType};
    use chrono::Utc;
    use uuid::Uuid;

    fn key(id: &str, status: KeyStatus) -> KeyMetadata {
        KeyMetadata {
            key_id: id.to_string(),
            key_type: KeyType::Rsa,
            key_size: 2048,
            status,
            created_at: Utc::now(),
            last_used: None,
            usage_count: 0,
            public_key_preview: String::new(),
            label: None,
        }
    }

    fn op(key_id: &str, operation_type: OperationType, ms: f64, success: bool) -> Operation {
        Operation {
            operation_id: Uuid::new_v4(),
            key_id: Some(key_id.to_string()),
            operation_type,
            data_hash: None,
            signature_preview: None,
            processing_time: ms,
            success,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_registry_has_zero_rates() {
        let stats = compute(&[], &[]);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_processing_time, 0.0);
        assert!(stats.by_operation_type.is_empty());
    }

    #[test]
    fn aggregates_keys_and_operations() {
        let keys = [key("a", KeyStatus::Active), key("b", KeyStatus::Inactive)];
        let ops = [
            op("a", OperationType::Signature, 2.0, true),
            op("a", OperationType::Signature, 4.0, false),
            op("b", OperationType::Encryption, 6.0, true),
            op("b", OperationType::Decryption, 8.0, true),
        ];

        let stats = compute(&keys, &ops);
        assert_eq!(stats.total_keys, 2);
        assert_eq!(stats.active_keys, 1);
        assert_eq!(stats.total_operations, 4);
        assert_eq!(stats.successful_operations, 3);
        assert_eq!(stats.success_rate, 0.75);
        assert_eq!(stats.avg_processing_time, 5.0);

        let signature = &stats.by_operation_type[&OperationType::Signature];
        assert_eq!(signature.count, 2);
        assert_eq!(signature.successful, 1);
        assert_eq!(signature.avg_processing_time, 3.0);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["by_operation_type"]["signature"].is_object());
    }

    #[test]
    fn key_summaries_join_operations() {
        let keys = vec![key("a", KeyStatus::Active), key("b", KeyStatus::Active)];
        let ops = [
            op("a", OperationType::Signature, 1.0, true),
            op("a", OperationType::Encryption, 3.0, true),
        ];

        let rows = key_summaries(keys, &ops);
        assert_eq!(rows[0].total_operations, 2);
        assert_eq!(rows[0].avg_processing_time, 2.0);
        assert_eq!(rows[1].total_operations, 0);
        assert_eq!(rows[1].avg_processing_time, 0.0);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["key_id"], "a");
        assert_eq!(json["total_operations"], 2);
    }
}
