//! # Hashing Utilities
//!
//! Two hash families, one per chain:
//!
//! - **BLAKE2b**: Substrate's hash. 256-bit digests shrink oversized
//!   payloads before signing and derive ecdsa account ids; the 512-bit
//!   variant feeds the SS58 address checksum.
//! - **Keccak-256**: Ethereum's hash, for transaction and message digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2b512};
use sha3::{Digest, Keccak256};

use crate::config::HASH_OUTPUT_LENGTH;

type Blake2b256 = Blake2b<U32>;

/// BLAKE2b with a 256-bit output, as used by `sp_core::blake2_256`.
pub fn blake2b_256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// BLAKE2b-512 over several parts, hashed as if concatenated.
pub fn blake2b_512_multi(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Keccak-256 (the pre-standard SHA-3 that Ethereum settled on).
pub fn keccak256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    Keccak256::digest(data).into()
}

/// EIP-191 personal message digest:
/// `keccak256("\x19Ethereum Signed Message:\n" || len || message)`.
pub fn ethereum_message_hash(message: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut prefixed = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_known_vector() {
        // blake2_256(b"") from the Substrate test suite.
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn keccak256_known_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn multi_part_hash_equals_concatenation() {
        let multi = blake2b_512_multi(&[b"SS58", b"PRE"]);
        let single = blake2b_512_multi(&[b"SS58PRE"]);
        assert_eq!(multi, single);
    }

    #[test]
    fn personal_message_hash_differs_from_plain_keccak() {
        let message = b"hello";
        assert_ne!(ethereum_message_hash(message), keccak256(message));
    }

    #[test]
    fn personal_message_hash_known_vector() {
        // web3.eth.accounts.hashMessage("hello")
        assert_eq!(
            hex::encode(ethereum_message_hash(b"hello")),
            "50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }
}
