use thiserror::Error;

/// 非对称原语层的错误
///
/// Messages carry the underlying `rsa`/`aes-gcm` detail. The service layer
/// decides what reaches a client.
#[derive(Error, Debug)]
pub enum AsymmetricError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("key encoding failed: {0}")]
    KeyEncoding(String),

    #[error("signing failed: {0}")]
    Signature(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}
