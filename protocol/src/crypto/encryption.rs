//! # AES-256-GCM Seed Sealing
//!
//! Seeds rest on the device encrypted under a key stretched from the user's
//! PIN. The unlock flow decrypts them once and hands the plaintext to a
//! [`SeedRef`](crate::seed::SeedRef); nothing else ever sees it.
//!
//! ## Wire format
//!
//! [`encrypt`] returns `nonce || ciphertext`. The first 12 bytes are a random
//! nonce, the rest is ciphertext plus the 16-byte GCM tag. [`decrypt`] expects
//! that same layout.
//!
//! Both take a `context` that is authenticated but not stored. Seeds pass
//! their id, so a blob copied under another id fails to open.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH};

/// PBKDF2-HMAC-SHA256 iterations for PIN stretching.
pub const PIN_KDF_ITERATIONS: u32 = 100_000;

/// Errors from sealing and unsealing.
///
/// A wrong PIN and a corrupted blob produce the same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong PIN or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {AES_NONCE_LENGTH} bytes")]
    CiphertextTooShort,
}

/// Stretch a PIN into an AES key with PBKDF2-HMAC-SHA256.
///
/// The returned key zeroizes itself on drop.
pub fn derive_pin_key(pin: &str, salt: &[u8]) -> Zeroizing<[u8; AES_KEY_LENGTH]> {
    let mut key = Zeroizing::new([0u8; AES_KEY_LENGTH]);
    pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PIN_KDF_ITERATIONS, key.as_mut_slice());
    key
}

/// Seal `plaintext` under `key`, authenticating `context`.
pub fn encrypt(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;

    let mut sealed = vec![0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut sealed);
    let body = cipher
        .encrypt(
            Nonce::from_slice(&sealed),
            Payload {
                msg: plaintext,
                aad: context,
            },
        )
        .map_err(|_| EncryptionError::EncryptFailed)?;

    sealed.extend_from_slice(&body);
    Ok(sealed)
}

/// Decrypt data produced by [`encrypt`].
///
/// The plaintext is wrapped in [`Zeroizing`] because every caller in this
/// crate decrypts seed material.
pub fn decrypt(
    key: &[u8; AES_KEY_LENGTH],
    sealed: &[u8],
    context: &[u8],
) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
    if sealed.len() < AES_NONCE_LENGTH {
        return Err(EncryptionError::CiphertextTooShort);
    }
    let (nonce, body) = sealed.split_at(AES_NONCE_LENGTH);

    Aes256Gcm::new_from_slice(key)
        .map_err(|_| EncryptionError::DecryptFailed)?
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: body,
                aad: context,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| EncryptionError::DecryptFailed)
}
