//! # Key Backends
//!
//! Key derivation is an opaque capability as far as the signing pipeline is
//! concerned: it hands a seed, a derivation path, a [`SignatureScheme`] and a
//! message to a [`KeyBackend`] and gets signature bytes back. Production
//! builds plug in a secure-enclave or BIP32/SLIP-10 backend; the crate ships
//! [`SoftwareKeyBackend`] for tests, the CLI, and devices without one.
//!
//! ## Security considerations
//!
//! - Derived secrets live in [`Zeroizing`] buffers and are wiped on drop.
//! - Secrets never leave this module. The only outputs are public keys and
//!   signatures.
//! - Key bytes are never logged.

use ed25519_dalek::{Signer, SigningKey as Ed25519SigningKey};
use k256::ecdsa::SigningKey as EcdsaSigningKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

use super::hash::blake2b_256;
use crate::config::{CRYPTO_ECDSA, CRYPTO_ED25519, CRYPTO_SR25519, HASH_OUTPUT_LENGTH};

/// Errors from key derivation and signing.
///
/// Never carries key material or the reason a secret was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("signature scheme {0} is not supported by this key backend")]
    UnsupportedScheme(SignatureScheme),

    #[error("derived secret is not a valid key for {0}")]
    InvalidSecret(SignatureScheme),

    #[error("message must be a 32-byte digest for {0}")]
    InvalidDigest(SignatureScheme),

    #[error("signing failed")]
    SigningFailed,
}

/// The signature algorithms the offline signer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    /// Substrate ed25519 over the raw message.
    Ed25519,
    /// Substrate sr25519 (schnorrkel).
    Sr25519,
    /// Substrate ecdsa: secp256k1 over `blake2b_256(message)`, 65 bytes.
    Ecdsa,
    /// Ethereum: secp256k1 over a caller-provided keccak digest, `v` in {27, 28}.
    Ethereum,
}

impl SignatureScheme {
    /// Map a UOS crypto byte to a Substrate scheme.
    pub fn from_substrate_byte(byte: u8) -> Option<Self> {
        match byte {
            CRYPTO_ED25519 => Some(Self::Ed25519),
            CRYPTO_SR25519 => Some(Self::Sr25519),
            CRYPTO_ECDSA => Some(Self::Ecdsa),
            _ => None,
        }
    }

    /// The `MultiSignature` discriminant Substrate expects in front of a
    /// signature. `None` for Ethereum.
    pub fn multi_signature_prefix(&self) -> Option<u8> {
        match self {
            Self::Ed25519 => Some(CRYPTO_ED25519),
            Self::Sr25519 => Some(CRYPTO_SR25519),
            Self::Ecdsa => Some(CRYPTO_ECDSA),
            Self::Ethereum => None,
        }
    }

    fn derivation_tag(&self) -> &'static [u8] {
        match self {
            Self::Ed25519 => b"ed25519",
            Self::Sr25519 => b"sr25519",
            // Substrate ecdsa and Ethereum share the secp256k1 key at a path.
            Self::Ecdsa | Self::Ethereum => b"secp256k1",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ed25519 => "ed25519",
            Self::Sr25519 => "sr25519",
            Self::Ecdsa => "ecdsa",
            Self::Ethereum => "ethereum",
        };
        f.write_str(name)
    }
}

/// Derives keys from a seed and signs with them.
///
/// Implementations must be deterministic: the same `(seed, path, scheme)`
/// always yields the same key.
pub trait KeyBackend: Send + Sync {
    /// Public key for `path`. Ed25519 keys are 32 bytes, secp256k1 keys are
    /// 33-byte SEC1 compressed points.
    fn public_key(
        &self,
        seed: &[u8],
        path: &str,
        scheme: SignatureScheme,
    ) -> Result<Vec<u8>, KeyError>;

    /// Sign `message` with the key at `path`.
    fn sign(
        &self,
        seed: &[u8],
        path: &str,
        scheme: SignatureScheme,
        message: &[u8],
    ) -> Result<Vec<u8>, KeyError>;
}

/// Pure-software backend built on `ed25519-dalek` and `k256`.
///
/// Secrets are `blake2b_256(tag || seed || path)`. Sr25519 is not available.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareKeyBackend;

impl SoftwareKeyBackend {
    fn derive_secret(
        seed: &[u8],
        path: &str,
        scheme: SignatureScheme,
    ) -> Zeroizing<[u8; HASH_OUTPUT_LENGTH]> {
        let mut material = Zeroizing::new(Vec::with_capacity(seed.len() + path.len() + 16));
        material.extend_from_slice(scheme.derivation_tag());
        material.extend_from_slice(seed);
        material.extend_from_slice(path.as_bytes());
        Zeroizing::new(blake2b_256(&material))
    }

    fn ed25519_key(seed: &[u8], path: &str) -> Ed25519SigningKey {
        let secret = Self::derive_secret(seed, path, SignatureScheme::Ed25519);
        Ed25519SigningKey::from_bytes(&secret)
    }

    fn ecdsa_key(
        seed: &[u8],
        path: &str,
        scheme: SignatureScheme,
    ) -> Result<EcdsaSigningKey, KeyError> {
        let secret = Self::derive_secret(seed, path, scheme);
        EcdsaSigningKey::from_slice(secret.as_slice()).map_err(|_| KeyError::InvalidSecret(scheme))
    }

    fn sign_prehash(
        key: &EcdsaSigningKey,
        digest: &[u8],
        v_offset: u8,
    ) -> Result<Vec<u8>, KeyError> {
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(digest)
            .map_err(|_| KeyError::SigningFailed)?;
        let mut out = signature.to_bytes().to_vec();
        out.push(recovery_id.to_byte() + v_offset);
        Ok(out)
    }
}

impl KeyBackend for SoftwareKeyBackend {
    fn public_key(
        &self,
        seed: &[u8],
        path: &str,
        scheme: SignatureScheme,
    ) -> Result<Vec<u8>, KeyError> {
        match scheme {
            SignatureScheme::Ed25519 => Ok(Self::ed25519_key(seed, path)
                .verifying_key()
                .to_bytes()
                .to_vec()),
            SignatureScheme::Ecdsa | SignatureScheme::Ethereum => {
                let key = Self::ecdsa_key(seed, path, scheme)?;
                Ok(key.verifying_key().to_encoded_point(true).as_bytes().to_vec())
            }
            SignatureScheme::Sr25519 => Err(KeyError::UnsupportedScheme(scheme)),
        }
    }

    fn sign(
        &self,
        seed: &[u8],
        path: &str,
        scheme: SignatureScheme,
        message: &[u8],
    ) -> Result<Vec<u8>, KeyError> {
        match scheme {
            SignatureScheme::Ed25519 => {
                let key = Self::ed25519_key(seed, path);
                Ok(key.sign(message).to_bytes().to_vec())
            }
            SignatureScheme::Ecdsa => {
                let key = Self::ecdsa_key(seed, path, scheme)?;
                Self::sign_prehash(&key, &blake2b_256(message), 0)
            }
            SignatureScheme::Ethereum => {
                if message.len() != HASH_OUTPUT_LENGTH {
                    return Err(KeyError::InvalidDigest(scheme));
                }
                let key = Self::ecdsa_key(seed, path, scheme)?;
                Self::sign_prehash(&key, message, 27)
            }
            SignatureScheme::Sr25519 => Err(KeyError::UnsupportedScheme(scheme)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::keccak256;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey as EcdsaVerifyingKey};

    const SEED: &[u8] = b"bottom drive obey lake curtain smoke basket hold race lonely fit walk";

    #[test]
    fn derivation_is_deterministic_per_path() {
        let backend = SoftwareKeyBackend;
        let a = backend.public_key(SEED, "//kusama", SignatureScheme::Ed25519).unwrap();
        let b = backend.public_key(SEED, "//kusama", SignatureScheme::Ed25519).unwrap();
        let c = backend.public_key(SEED, "//edgeware", SignatureScheme::Ed25519).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn ed25519_signature_verifies() {
        let backend = SoftwareKeyBackend;
        let public = backend.public_key(SEED, "//0", SignatureScheme::Ed25519).unwrap();
        let sig = backend.sign(SEED, "//0", SignatureScheme::Ed25519, b"payload").unwrap();

        let public: [u8; 32] = public.try_into().unwrap();
        let vk = VerifyingKey::from_bytes(&public).unwrap();
        let sig = Signature::from_slice(&sig).unwrap();
        assert!(vk.verify(b"payload", &sig).is_ok());
    }

    #[test]
    fn ethereum_signature_recovers_signer() {
        let backend = SoftwareKeyBackend;
        let public = backend
            .public_key(SEED, "m/44'/60'/0'/0/0", SignatureScheme::Ethereum)
            .unwrap();
        let digest = keccak256(b"rlp bytes");
        let sig = backend
            .sign(SEED, "m/44'/60'/0'/0/0", SignatureScheme::Ethereum, &digest)
            .unwrap();

        assert_eq!(sig.len(), 65);
        assert!(sig[64] == 27 || sig[64] == 28);

        let signature = EcdsaSignature::from_slice(&sig[..64]).unwrap();
        let recovery_id = RecoveryId::from_byte(sig[64] - 27).unwrap();
        let recovered =
            EcdsaVerifyingKey::recover_from_prehash(&digest, &signature, recovery_id).unwrap();
        assert_eq!(recovered.to_encoded_point(true).as_bytes(), public.as_slice());
    }

    #[test]
    fn ethereum_requires_a_digest() {
        let err = SoftwareKeyBackend
            .sign(SEED, "", SignatureScheme::Ethereum, b"not a digest")
            .unwrap_err();
        assert_eq!(err, KeyError::InvalidDigest(SignatureScheme::Ethereum));
    }

    #[test]
    fn substrate_ecdsa_uses_raw_recovery_byte() {
        let sig = SoftwareKeyBackend
            .sign(SEED, "//0", SignatureScheme::Ecdsa, b"payload")
            .unwrap();
        assert_eq!(sig.len(), 65);
        assert!(sig[64] <= 1);
    }

    #[test]
    fn sr25519_is_unsupported() {
        let err = SoftwareKeyBackend
            .sign(SEED, "", SignatureScheme::Sr25519, b"x")
            .unwrap_err();
        assert_eq!(err, KeyError::UnsupportedScheme(SignatureScheme::Sr25519));
    }

    #[test]
    fn multi_signature_prefixes() {
        assert_eq!(SignatureScheme::Ed25519.multi_signature_prefix(), Some(0));
        assert_eq!(SignatureScheme::Sr25519.multi_signature_prefix(), Some(1));
        assert_eq!(SignatureScheme::Ecdsa.multi_signature_prefix(), Some(2));
        assert_eq!(SignatureScheme::Ethereum.multi_signature_prefix(), None);
        assert_eq!(SignatureScheme::from_substrate_byte(0x02), Some(SignatureScheme::Ecdsa));
        assert_eq!(SignatureScheme::from_substrate_byte(0x09), None);
    }
}
