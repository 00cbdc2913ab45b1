//! 哈希算法
//!
//! The digest set offered by the registry, hex digest computation, integrity
//! comparison, a throughput benchmark and the collision-resistance
//! demonstration.

use crate::common::utils::{constant_time_eq, elapsed_ms, preview};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use sha3::{Sha3_256, Sha3_512};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// 支持的哈希算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha512")]
    Sha512,
    #[serde(rename = "sha3_256")]
    Sha3_256,
    #[serde(rename = "sha3_512")]
    Sha3_512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha3_256,
        HashAlgorithm::Sha3_512,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha3_256 => "sha3_256",
            HashAlgorithm::Sha3_512 => "sha3_512",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 | HashAlgorithm::Sha3_256 => 32,
            HashAlgorithm::Sha512 | HashAlgorithm::Sha3_512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
            HashAlgorithm::Sha3_256 => Sha3_256::digest(data).to_vec(),
            HashAlgorithm::Sha3_512 => Sha3_512::digest(data).to_vec(),
        }
    }

    /// Lowercase hex digest.
    pub fn hex_digest(self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }

    /// Recomputes the digest of `data` and compares it to `expected_hex` in constant time.
    ///
    /// The comparison ignores case and surrounding whitespace in `expected_hex`.
    pub fn verify_integrity(self, data: &[u8], expected_hex: &str) -> bool {
        let computed = self.hex_digest(data);
        let expected = expected_hex.trim().to_ascii_lowercase();
        constant_time_eq(computed.as_bytes(), expected.as_bytes())
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    /// Accepts `sha256`, `SHA-256`, `sha3-256`, `sha3_256` and similar spellings.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        match normalized.as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "sha3256" => Ok(HashAlgorithm::Sha3_256),
            "sha3512" => Ok(HashAlgorithm::Sha3_512),
            "md5" | "sha1" => Err(Error::InvalidInput(format!(
                "hash algorithm '{}' is deprecated and not supported",
                s.trim()
            ))),
            _ => Err(Error::InvalidInput(format!(
                "unsupported hash algorithm '{}'",
                s.trim()
            ))),
        }
    }
}

/// SHA-256 hex digest, used for operation records.
pub fn sha256_hex(data: &[u8]) -> String {
    HashAlgorithm::Sha256.hex_digest(data)
}

/// 单个算法的基准结果
#[derive(Debug, Clone, Serialize)]
pub struct HashBenchmarkEntry {
    pub algorithm: HashAlgorithm,
    /// Mean milliseconds per digest.
    pub time_per_operation: f64,
    /// Hex digest length in characters.
    pub hash_length: usize,
    pub hash_sample: String,
}

/// Largest benchmark input accepted, in bytes, before it is repeated.
pub const MAX_BENCHMARK_INPUT: usize = 1024;

const BENCHMARK_REPEAT: usize = 1000;

/// Digests `data` repeated 1000 times, `iterations` times per algorithm.
///
/// `data` longer than [`MAX_BENCHMARK_INPUT`] is rejected with `InvalidInput`.
pub fn benchmark(data: &[u8], iterations: usize) -> Result<Vec<HashBenchmarkEntry>> {
    if data.len() > MAX_BENCHMARK_INPUT {
        return Err(Error::InvalidInput(format!(
            "benchmark data is {} bytes, at most {} allowed",
            data.len(),
            MAX_BENCHMARK_INPUT
        )));
    }
    let test_data = data.repeat(BENCHMARK_REPEAT);
    let iterations = iterations.max(1);

    Ok(HashAlgorithm::ALL
        .iter()
        .map(|&algorithm| {
            let start = Instant::now();
            let mut hash_value = String::new();
            for _ in 0..iterations {
                hash_value = algorithm.hex_digest(&test_data);
            }
            let total = elapsed_ms(start);
            HashBenchmarkEntry {
                algorithm,
                time_per_operation: total / iterations as f64,
                hash_length: hash_value.len(),
                hash_sample: preview(&hash_value, 16),
            }
        })
        .collect())
}

/// 抗碰撞性演示条目
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "concept", rename_all = "snake_case")]
pub enum CollisionDemonstration {
    AvalancheEffect {
        description: String,
        original: String,
        modified: String,
        changed: bool,
        /// Fraction of digest bits that differ.
        bit_difference_ratio: f64,
    },
    FixedSize {
        description: String,
        /// (input preview, input length, hex digest length)
        sizes: Vec<FixedSizeSample>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FixedSizeSample {
    pub input: String,
    pub input_length: usize,
    pub hash_length: usize,
}

/// Avalanche and fixed-size examples over `algorithm`.
pub fn collision_resistance(algorithm: HashAlgorithm) -> Vec<CollisionDemonstration> {
    let original = "Hello World";
    let modified = "Hello World!";
    let a = algorithm.digest(original.as_bytes());
    let b = algorithm.digest(modified.as_bytes());
    let differing_bits: u32 = a.iter().zip(&b).map(|(x, y)| (x ^ y).count_ones()).sum();

    let sizes = [1usize, 100, 1000]
        .into_iter()
        .map(|n| {
            let input = "a".repeat(n);
            FixedSizeSample {
                input: preview(&input, 10),
                input_length: n,
                hash_length: algorithm.hex_digest(input.as_bytes()).len(),
            }
        })
        .collect();

    vec![
        CollisionDemonstration::AvalancheEffect {
            description: "a one-character change produces an unrelated digest".to_string(),
            original: format!("{original} → {}", hex::encode(&a)),
            modified: format!("{modified} → {}", hex::encode(&b)),
            changed: a != b,
            bit_difference_ratio: differing_bits as f64 / (a.len() * 8) as f64,
        },
        CollisionDemonstration::FixedSize {
            description: "the digest length does not depend on the input length".to_string(),
            sizes,
        },
    ]
}
