//! # Seed References
//!
//! A decrypted seed is the most sensitive thing the app ever holds. Instead of
//! passing it around, the unlock flow wraps it in a [`SeedRef`]: a revocable
//! capability that can produce signatures and nothing else.
//!
//! ```text
//! EncryptedSeed ──unlock(pin)──▶ SeedRef ──sign(request)──▶ signature
//!                                   │
//!                          invalidate() / invalidate_all()
//! ```
//!
//! ## Lifecycle
//!
//! - Handles are created only by [`SeedRefs::unlock`].
//! - Signing never invalidates a handle; a user may sign several payloads
//!   while unlocked.
//! - Invalidation is irreversible. Identity deletion, explicit lock and app
//!   backgrounding all invalidate.
//! - Nothing here is `Serialize`. Handles never leave the process.

pub mod handle;
pub mod request;
pub mod store;

pub use handle::SeedRef;
pub use request::SigningRequest;
pub use store::{EncryptedSeed, SeedRefs};

use thiserror::Error;

use crate::crypto::{EncryptionError, KeyError, SignatureScheme};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("seed handle has been invalidated")]
    Invalidated,

    #[error("wallet {0} is locked")]
    Locked(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("signature scheme {0} is not supported")]
    UnsupportedScheme(SignatureScheme),

    #[error("unlock failed: {0}")]
    Unlock(#[from] EncryptionError),
}

impl From<KeyError> for SeedError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::UnsupportedScheme(scheme) => SeedError::UnsupportedScheme(scheme),
            other => SeedError::SigningFailed(other.to_string()),
        }
    }
}
