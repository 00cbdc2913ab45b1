//! 演示与基准
//!
//! Informational payloads for the `/benchmark/*` and `/demonstrate/*`
//! endpoints. Numbers are measured on the running host.

use crate::asymmetric::systems::traditional::EncryptionPadding;
use crate::asymmetric::{AsymmetricCryptographicSystem, RsaCryptoSystem};
use crate::common::utils::{elapsed_ms, preview};
use crate::error::Result;
use crate::hashing::HashAlgorithm;
use crate::service::CryptoService;
use serde::Serialize;
use std::time::Instant;
use tracing::warn;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const BENCHMARK_MESSAGE: &[u8] = b"Performance comparison of cryptographic operations";

/// 单个密钥长度的测量结果（毫秒）
#[derive(Debug, Clone, Serialize)]
pub struct KeySizeMeasurement {
    pub key_size: usize,
    pub generation_ms: f64,
    pub signature_ms: f64,
    pub encryption_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncryptionModeMeasurement {
    pub mode: &'static str,
    /// Encrypt plus decrypt, milliseconds.
    pub roundtrip_ms: f64,
    pub max_plaintext_len: usize,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub key_size_analysis: Vec<KeySizeMeasurement>,
    pub encryption_modes: Vec<EncryptionModeMeasurement>,
    pub parallel: bool,
}

/// Generates a throwaway key per size and times generation, signing and encryption.
pub fn performance_benchmark(key_sizes: &[usize]) -> Result<PerformanceReport> {
    #[cfg(feature = "parallel")]
    let key_size_analysis = key_sizes
        .par_iter()
        .map(|&bits| measure_key_size(bits))
        .collect::<Result<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let key_size_analysis = key_sizes
        .iter()
        .map(|&bits| measure_key_size(bits))
        .collect::<Result<Vec<_>>>()?;

    let mode_bits = key_sizes.iter().copied().min().unwrap_or(2048);
    Ok(PerformanceReport {
        key_size_analysis,
        encryption_modes: compare_encryption_modes(mode_bits)?,
        parallel: cfg!(feature = "parallel"),
    })
}

fn measure_key_size(bits: usize) -> Result<KeySizeMeasurement> {
    let start = Instant::now();
    let (public_key, private_key) = RsaCryptoSystem::generate_keypair(bits)?;
    let generation_ms = elapsed_ms(start);

    let start = Instant::now();
    RsaCryptoSystem::sign(&private_key, BENCHMARK_MESSAGE)?;
    let signature_ms = elapsed_ms(start);

    let start = Instant::now();
    RsaCryptoSystem::encrypt(&public_key, BENCHMARK_MESSAGE)?;
    let encryption_ms = elapsed_ms(start);

    Ok(KeySizeMeasurement {
        key_size: bits,
        generation_ms,
        signature_ms,
        encryption_ms,
    })
}

/// PKCS#1 v1.5 against OAEP(SHA-256) on one key of `bits` bits.
pub fn compare_encryption_modes(bits: usize) -> Result<Vec<EncryptionModeMeasurement>> {
    let (public_key, private_key) = RsaCryptoSystem::generate_keypair(bits)?;
    let modulus_bytes = RsaCryptoSystem::key_bits(&public_key)? / 8;

    [EncryptionPadding::Pkcs1v15, EncryptionPadding::OaepSha256]
        .into_iter()
        .map(|padding| {
            let start = Instant::now();
            let ciphertext = RsaCryptoSystem::encrypt_with(padding, &public_key, BENCHMARK_MESSAGE)?;
            let decrypted = RsaCryptoSystem::decrypt_with(padding, &private_key, &ciphertext)?;
            Ok(EncryptionModeMeasurement {
                mode: padding.label(),
                roundtrip_ms: elapsed_ms(start),
                max_plaintext_len: modulus_bytes.saturating_sub(padding.overhead()),
                success: decrypted == BENCHMARK_MESSAGE,
            })
        })
        .collect()
}

/// 一个安全概念的演示
#[derive(Debug, Clone, Serialize)]
pub struct ConceptDemonstration {
    pub concept: &'static str,
    pub description: &'static str,
    pub success: bool,
    #[serde(flatten)]
    pub details: ConceptDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConceptDetails {
    Confidentiality {
        original: String,
        encrypted: String,
        decrypted: String,
    },
    Integrity {
        original: String,
        modified: String,
        hashes_different: bool,
    },
    Authenticity {
        document: String,
        signature_created: bool,
        verification_result: bool,
    },
    NonRepudiation {
        engagement: String,
        signature_exists: bool,
        can_deny: bool,
    },
    Failed {
        error: String,
    },
}

/// Runs the four concept demonstrations against the default key.
///
/// The operations go through the service, so they are audited and counted
/// like any other request.
pub fn demonstrate_concepts(service: &CryptoService) -> Vec<ConceptDemonstration> {
    let demos: [(&'static str, &'static str, fn(&CryptoService) -> Result<(bool, ConceptDetails)>); 4] = [
        (
            "confidentiality",
            "only the private key holder can read the message",
            confidentiality,
        ),
        (
            "integrity",
            "any modification of the message changes its digest",
            integrity,
        ),
        (
            "authenticity",
            "a valid signature proves the signer holds the private key",
            authenticity,
        ),
        (
            "non_repudiation",
            "a signer cannot deny a signature that verifies",
            non_repudiation,
        ),
    ];

    demos
        .into_iter()
        .map(|(concept, description, run)| match run(service) {
            Ok((success, details)) => ConceptDemonstration {
                concept,
                description,
                success,
                details,
            },
            Err(err) => {
                warn!(concept, error = %err, "concept demonstration failed");
                ConceptDemonstration {
                    concept,
                    description,
                    success: false,
                    details: ConceptDetails::Failed {
                        error: err.public_message(),
                    },
                }
            }
        })
        .collect()
}

fn confidentiality(service: &CryptoService) -> Result<(bool, ConceptDetails)> {
    let original = "Secret message for the confidentiality demonstration";
    let encrypted = service.encrypt(original, None)?;
    let decrypted = service.decrypt(&encrypted.encrypted_data)?;
    Ok((
        decrypted.decrypted_data == original,
        ConceptDetails::Confidentiality {
            original: original.to_string(),
            encrypted: preview(&encrypted.encrypted_data, 50),
            decrypted: decrypted.decrypted_data,
        },
    ))
}

fn integrity(service: &CryptoService) -> Result<(bool, ConceptDetails)> {
    let original = "Important document";
    let modified = "Important document!";
    let algorithm = Some(HashAlgorithm::Sha256);
    let a = service.compute_hash(original, algorithm)?.hash;
    let b = service.compute_hash(modified, algorithm)?.hash;
    Ok((
        a != b,
        ConceptDetails::Integrity {
            original: format!("{original} → {a}"),
            modified: format!("{modified} → {b}"),
            hashes_different: a != b,
        },
    ))
}

fn authenticity(service: &CryptoService) -> Result<(bool, ConceptDetails)> {
    let document = "Authentic contract";
    let signed = service.sign(document, None)?;
    let verified = service.verify(document, &signed.signature, Some(&signed.key_id))?;
    Ok((
        verified.valid,
        ConceptDetails::Authenticity {
            document: document.to_string(),
            signature_created: true,
            verification_result: verified.valid,
        },
    ))
}

fn non_repudiation(service: &CryptoService) -> Result<(bool, ConceptDetails)> {
    let engagement = "I commit to paying 1000 EUR";
    let signed = service.sign(engagement, None)?;
    let verified = service.verify(engagement, &signed.signature, Some(&signed.key_id))?;
    Ok((
        verified.valid,
        ConceptDetails::NonRepudiation {
            engagement: engagement.to_string(),
            signature_exists: true,
            can_deny: !verified.valid,
        },
    ))
}
