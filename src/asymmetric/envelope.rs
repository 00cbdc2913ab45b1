//! 加密信封
//!
//! Payloads that fit in one RSA block are encrypted directly. Larger payloads
//! get a fresh AES-256-GCM data key which is itself RSA-encrypted. Layout:
//!
//! ```text
//! direct: [0x01][rsa ciphertext]
//! hybrid: [0x02][u16 BE wrapped-key len][wrapped key][12-byte nonce][aes-gcm ciphertext + tag]
//! ```
//!
//! The hybrid body is authenticated with the caller-supplied associated data
//! (the key id), so an envelope moved under another key id fails to open.

use crate::asymmetric::errors::AsymmetricError;
use crate::asymmetric::traits::AsymmetricCryptographicSystem;
use crate::common::utils::ZeroizingVec;
use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

const MODE_DIRECT: u8 = 0x01;
const MODE_HYBRID: u8 = 0x02;
const NONCE_SIZE: usize = 12;

/// 信封模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeMode {
    Direct,
    Hybrid,
}

/// Encrypts `plaintext` for `public_key`, choosing the mode by payload size.
pub fn seal<S>(
    public_key: &S::PublicKey,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<(Vec<u8>, EnvelopeMode), AsymmetricError>
where
    S: AsymmetricCryptographicSystem<Error = AsymmetricError>,
{
    if plaintext.len() <= S::max_plaintext_len(public_key)? {
        let ciphertext = S::encrypt(public_key, plaintext)?;
        let mut out = Vec::with_capacity(1 + ciphertext.len());
        out.push(MODE_DIRECT);
        out.extend_from_slice(&ciphertext);
        return Ok((out, EnvelopeMode::Direct));
    }

    let data_key = ZeroizingVec(Aes256Gcm::generate_key(&mut OsRng).to_vec());
    let cipher = Aes256Gcm::new_from_slice(&data_key)
        .map_err(|e| AsymmetricError::Encryption(format!("AES密钥无效: {}", e)))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let body = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|e| AsymmetricError::Encryption(format!("AES-GCM加密失败: {}", e)))?;

    let wrapped_key = S::encrypt(public_key, &data_key)?;
    let wrapped_len = u16::try_from(wrapped_key.len()).map_err(|_| {
        AsymmetricError::Encryption("wrapped data key does not fit the envelope".to_string())
    })?;

    let mut out = Vec::with_capacity(3 + wrapped_key.len() + NONCE_SIZE + body.len());
    out.push(MODE_HYBRID);
    out.extend_from_slice(&wrapped_len.to_be_bytes());
    out.extend_from_slice(&wrapped_key);
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&body);
    Ok((out, EnvelopeMode::Hybrid))
}

/// Opens an envelope produced by [`seal`]. Any malformed input is a `Decryption` error.
pub fn open<S>(
    private_key: &S::PrivateKey,
    envelope: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, AsymmetricError>
where
    S: AsymmetricCryptographicSystem<Error = AsymmetricError>,
{
    let (&mode, rest) = envelope
        .split_first()
        .ok_or_else(|| malformed("empty envelope"))?;

    match mode {
        MODE_DIRECT => S::decrypt(private_key, rest),
        MODE_HYBRID => {
            if rest.len() < 2 {
                return Err(malformed("truncated header"));
            }
            let (len_bytes, rest) = rest.split_at(2);
            let wrapped_len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
            if rest.len() < wrapped_len + NONCE_SIZE {
                return Err(malformed("truncated body"));
            }
            let (wrapped_key, rest) = rest.split_at(wrapped_len);
            let (nonce, body) = rest.split_at(NONCE_SIZE);

            let data_key = ZeroizingVec(S::decrypt(private_key, wrapped_key)?);
            let cipher =
                Aes256Gcm::new_from_slice(&data_key).map_err(|_| malformed("bad data key"))?;
            cipher
                .decrypt(
                    Nonce::from_slice(nonce),
                    Payload {
                        msg: body,
                        aad: associated_data,
                    },
                )
                .map_err(|_| AsymmetricError::Decryption("AES-GCM认证失败".to_string()))
        }
        other => Err(malformed(&format!("unknown mode 0x{other:02x}"))),
    }
}

fn malformed(detail: &str) -> AsymmetricError {
    AsymmetricError::Decryption(format!("malformed envelope: {detail}"))
}
