//! # Traditional Cryptographic Algorithm Module
//!
//! RSA behind the `AsymmetricCryptographicSystem` trait.
//!
//! ---
//!
//! # 传统加密算法模块
//!
//! 本模块提供符合 `AsymmetricCryptographicSystem` 特征的 RSA 实现。

pub mod rsa;

pub use rsa::{EncryptionPadding, RsaCryptoSystem, RsaPrivateKeyWrapper, RsaPublicKeyWrapper};
