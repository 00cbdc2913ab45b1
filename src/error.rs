//! Defines the custom error type for the `seal-registry` crate.

use crate::asymmetric::errors::AsymmetricError;
use thiserror::Error;

/// The main error type for the `seal-registry` crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("key is inactive: {0}")]
    KeyInactive(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("decoding from Base64 failed: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("asymmetric cryptographic error: {0}")]
    Asymmetric(#[from] AsymmetricError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`Error`], used at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    KeyInactive,
    Conflict,
    DecryptionFailed,
    Storage,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_)
            | Error::InvalidParameter(_)
            | Error::Base64Decode(_)
            | Error::Configuration(_) => ErrorKind::InvalidInput,
            Error::KeyNotFound(_) => ErrorKind::NotFound,
            Error::KeyInactive(_) => ErrorKind::KeyInactive,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::DecryptionFailed(_) => ErrorKind::DecryptionFailed,
            Error::Storage(_) | Error::Io(_) | Error::Serialization(_) => ErrorKind::Storage,
            Error::Asymmetric(AsymmetricError::PayloadTooLarge { .. }) => ErrorKind::InvalidInput,
            Error::Asymmetric(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message that may cross the service boundary.
    ///
    /// Storage and internal faults are reported generically; their detail only
    /// goes to the server log.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Storage => "storage error".to_string(),
            ErrorKind::Internal => "internal cryptographic error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Maps a poisoned lock into a storage fault.
    pub(crate) fn poisoned<T>(_: std::sync::PoisonError<T>) -> Self {
        Error::Storage("registry lock poisoned".to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = Error::Storage("disk /var/lib/registry.json is full".to_string());
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.public_message(), "storage error");
    }

    #[test]
    fn test_domain_errors_keep_their_message() {
        let err = Error::KeyInactive("rsa-1".to_string());
        assert_eq!(err.kind(), ErrorKind::KeyInactive);
        assert_eq!(err.public_message(), "key is inactive: rsa-1");
    }

    #[test]
    fn test_oversized_payload_is_an_input_error() {
        let err = Error::from(AsymmetricError::PayloadTooLarge { len: 300, max: 245 });
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
