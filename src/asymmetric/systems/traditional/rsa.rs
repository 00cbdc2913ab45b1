//! `RsaCryptoSystem` 提供基于 RSA 的签名 (PSS/SHA-256) 与加解密 (PKCS#1 v1.5 / OAEP)。

use crate::asymmetric::errors::AsymmetricError;
use crate::asymmetric::traits::AsymmetricCryptographicSystem;
use crate::common::utils::ZeroizingVec;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::pss::{Signature as PssSignature, SigningKey, VerifyingKey};
use rsa::rand_core::OsRng as RsaOsRng;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// PKCS#1 v1.5 填充开销
const PKCS1V15_OVERHEAD: usize = 11;
/// OAEP(SHA-256) 填充开销：2 * hLen + 2
const OAEP_SHA256_OVERHEAD: usize = 2 * 32 + 2;

/// RSA公钥包装器，保存 SPKI DER
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsaPublicKeyWrapper(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl RsaPublicKeyWrapper {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn decode(&self) -> Result<RsaPublicKey, AsymmetricError> {
        RsaPublicKey::from_public_key_der(&self.0)
            .map_err(|e| AsymmetricError::KeyEncoding(format!("解析RSA公钥失败: {}", e)))
    }
}

/// RSA私钥包装器，保存 PKCS#8 DER，释放时清零
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsaPrivateKeyWrapper(pub ZeroizingVec);

impl RsaPrivateKeyWrapper {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn decode(&self) -> Result<RsaPrivateKey, AsymmetricError> {
        RsaPrivateKey::from_pkcs8_der(&self.0)
            .map_err(|e| AsymmetricError::KeyEncoding(format!("解析RSA私钥失败: {}", e)))
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> Result<RsaPublicKeyWrapper, AsymmetricError> {
        let public_key = RsaPublicKey::from(&self.decode()?);
        encode_public(&public_key)
    }
}

/// 加密填充方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionPadding {
    Pkcs1v15,
    OaepSha256,
}

impl EncryptionPadding {
    pub fn overhead(self) -> usize {
        match self {
            EncryptionPadding::Pkcs1v15 => PKCS1V15_OVERHEAD,
            EncryptionPadding::OaepSha256 => OAEP_SHA256_OVERHEAD,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EncryptionPadding::Pkcs1v15 => "RSA-PKCS1v15",
            EncryptionPadding::OaepSha256 => "RSA-OAEP-SHA256",
        }
    }
}

/// RSA加密系统实现
///
/// Trait-level `encrypt`/`decrypt` use PKCS#1 v1.5; the OAEP path is
/// reachable through [`RsaCryptoSystem::encrypt_with`].
pub struct RsaCryptoSystem;

impl RsaCryptoSystem {
    /// 使用指定填充加密
    pub fn encrypt_with(
        padding: EncryptionPadding,
        public_key: &RsaPublicKeyWrapper,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, AsymmetricError> {
        let public_key = public_key.decode()?;
        let max = public_key.size().saturating_sub(padding.overhead());
        if plaintext.len() > max {
            return Err(AsymmetricError::PayloadTooLarge {
                len: plaintext.len(),
                max,
            });
        }

        let mut rng = RsaOsRng;
        let result = match padding {
            EncryptionPadding::Pkcs1v15 => public_key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext),
            EncryptionPadding::OaepSha256 => {
                public_key.encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext)
            }
        };
        result.map_err(|e| AsymmetricError::Encryption(format!("RSA加密失败: {}", e)))
    }

    /// 使用指定填充解密
    pub fn decrypt_with(
        padding: EncryptionPadding,
        private_key: &RsaPrivateKeyWrapper,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AsymmetricError> {
        let private_key = private_key.decode()?;
        let result = match padding {
            EncryptionPadding::Pkcs1v15 => private_key.decrypt(Pkcs1v15Encrypt, ciphertext),
            EncryptionPadding::OaepSha256 => private_key.decrypt(Oaep::new::<Sha256>(), ciphertext),
        };
        result.map_err(|e| AsymmetricError::Decryption(format!("RSA解密失败: {}", e)))
    }

    /// Modulus length in bits.
    pub fn key_bits(public_key: &RsaPublicKeyWrapper) -> Result<usize, AsymmetricError> {
        Ok(public_key.decode()?.size() * 8)
    }
}

impl AsymmetricCryptographicSystem for RsaCryptoSystem {
    type PublicKey = RsaPublicKeyWrapper;
    type PrivateKey = RsaPrivateKeyWrapper;
    type Error = AsymmetricError;

    fn generate_keypair(bits: usize) -> Result<(Self::PublicKey, Self::PrivateKey), Self::Error> {
        let mut rsa_rng = RsaOsRng;

        let private_key = RsaPrivateKey::new(&mut rsa_rng, bits)
            .map_err(|e| AsymmetricError::KeyGeneration(format!("生成RSA密钥失败: {}", e)))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_der = private_key
            .to_pkcs8_der()
            .map_err(|e| AsymmetricError::KeyEncoding(format!("导出RSA私钥DER失败: {}", e)))?;

        Ok((
            encode_public(&public_key)?,
            RsaPrivateKeyWrapper(ZeroizingVec(private_der.as_bytes().to_vec())),
        ))
    }

    fn encrypt(public_key: &Self::PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, Self::Error> {
        Self::encrypt_with(EncryptionPadding::Pkcs1v15, public_key, plaintext)
    }

    fn decrypt(private_key: &Self::PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, Self::Error> {
        Self::decrypt_with(EncryptionPadding::Pkcs1v15, private_key, ciphertext)
    }

    fn max_plaintext_len(public_key: &Self::PublicKey) -> Result<usize, Self::Error> {
        Ok(public_key.decode()?.size().saturating_sub(PKCS1V15_OVERHEAD))
    }

    fn sign(private_key: &Self::PrivateKey, message: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let signing_key = SigningKey::<Sha256>::new(private_key.decode()?);
        let mut rng = RsaOsRng;
        let signature = signing_key
            .try_sign_with_rng(&mut rng, message)
            .map_err(|e| AsymmetricError::Signature(format!("RSA签名失败: {}", e)))?;

        Ok(signature.to_vec())
    }

    fn verify(
        public_key: &Self::PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, Self::Error> {
        let verifying_key = VerifyingKey::<Sha256>::new(public_key.decode()?);
        // 格式错误的签名视为验证失败，而不是错误
        let Ok(signature) = PssSignature::try_from(signature) else {
            return Ok(false);
        };
        Ok(verifying_key.verify(message, &signature).is_ok())
    }

    fn export_public_key(public_key: &Self::PublicKey) -> Result<String, Self::Error> {
        public_key
            .decode()?
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AsymmetricError::KeyEncoding(format!("RSA公钥导出失败: {}", e)))
    }
}

fn encode_public(public_key: &RsaPublicKey) -> Result<RsaPublicKeyWrapper, AsymmetricError> {
    let public_der = public_key
        .to_public_key_der()
        .map_err(|e| AsymmetricError::KeyEncoding(format!("导出RSA公钥DER失败: {}", e)))?;
    Ok(RsaPublicKeyWrapper(public_der.as_bytes().to_vec()))
}
