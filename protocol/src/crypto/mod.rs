//! # Cryptographic Primitives
//!
//! Everything key-shaped in the signer flows through here:
//!
//! - **hash**: BLAKE2b and Keccak-256 helpers.
//! - **keys**: the [`KeyBackend`] capability and its software implementation.
//! - **encryption**: AES-256-GCM sealing of seeds under a PBKDF2 PIN key.
//!
//! Nothing here is novel. Each function is a thin, typed wrapper around an
//! audited implementation.

pub mod encryption;
pub mod hash;
pub mod keys;

pub use encryption::{decrypt, derive_pin_key, encrypt, EncryptionError};
pub use hash::{blake2b_256, ethereum_message_hash, keccak256};
pub use keys::{KeyBackend, KeyError, SignatureScheme, SoftwareKeyBackend};
