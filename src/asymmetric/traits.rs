//! 定义了非对称加密系统的核心 Trait。
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// `AsymmetricCryptographicSystem` 定义了注册表使用的非对称算法必须实现的功能。
///
/// Keys are opaque wrappers so that a [`crate::store::KeyStore`] can persist
/// them without knowing the algorithm. `verify` reports a mismatch as
/// `Ok(false)`; `Err` is reserved for keys or inputs that cannot be processed.
pub trait AsymmetricCryptographicSystem: Sized {
    /// 公钥类型
    type PublicKey: Clone + Serialize + for<'de> Deserialize<'de> + Debug;

    /// 私钥类型
    type PrivateKey: Clone + Serialize + for<'de> Deserialize<'de> + Debug;

    /// 错误类型
    type Error: std::error::Error + Send + Sync + 'static;

    /// 生成指定位数的密钥对
    fn generate_keypair(bits: usize) -> Result<(Self::PublicKey, Self::PrivateKey), Self::Error>;

    /// 使用公钥加密单个数据块
    fn encrypt(public_key: &Self::PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// 使用私钥解密单个数据块
    fn decrypt(private_key: &Self::PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Largest plaintext `encrypt` accepts for this key.
    fn max_plaintext_len(public_key: &Self::PublicKey) -> Result<usize, Self::Error>;

    /// 对消息签名
    fn sign(private_key: &Self::PrivateKey, message: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// 验证签名
    fn verify(
        public_key: &Self::PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, Self::Error>;

    /// 将公钥导出为 PEM
    fn export_public_key(public_key: &Self::PublicKey) -> Result<String, Self::Error>;
}
