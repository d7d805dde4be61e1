//! Encrypted seeds at rest and the live handles unlocked from them.

use std::sync::Arc;

use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use super::handle::SeedRef;
use super::SeedError;
use crate::crypto::{decrypt, derive_pin_key, encrypt, EncryptionError, KeyBackend};

const SALT_LENGTH: usize = 16;

/// A seed sealed under a PIN, as the device stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSeed {
    /// Identifier wallets refer to the seed by.
    pub id: String,
    #[serde(with = "hex::serde")]
    pub salt: Vec<u8>,
    /// `nonce || ciphertext` from [`encrypt`], bound to `id`.
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedSeed {
    /// Seal `seed` under `pin` with a fresh random salt.
    pub fn seal(id: impl Into<String>, seed: &[u8], pin: &str) -> Result<Self, EncryptionError> {
        let mut salt = vec![0u8; SALT_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let key = derive_pin_key(pin, &salt);
        let id = id.into();
        let ciphertext = encrypt(&key, seed, id.as_bytes())?;
        Ok(Self {
            id,
            salt,
            ciphertext,
        })
    }

    pub fn open(&self, pin: &str) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
        let key = derive_pin_key(pin, &self.salt);
        decrypt(&key, &self.ciphertext, self.id.as_bytes())
    }
}

/// Live seed handles keyed by encrypted-seed id.
///
/// At most one handle exists per id. Unlocking again replaces, and revokes,
/// the previous one.
pub struct SeedRefs {
    handles: DashMap<String, SeedRef>,
    backend: Arc<dyn KeyBackend>,
}

impl SeedRefs {
    pub fn new(backend: Arc<dyn KeyBackend>) -> Self {
        Self {
            handles: DashMap::new(),
            backend,
        }
    }

    /// Decrypt `seed` with `pin` and register a handle for it.
    pub fn unlock(&self, seed: &EncryptedSeed, pin: &str) -> Result<SeedRef, SeedError> {
        let plaintext = seed.open(pin)?;
        let handle = SeedRef::new(seed.id.clone(), plaintext, Arc::clone(&self.backend));
        if let Some(previous) = self.handles.insert(seed.id.clone(), handle.clone()) {
            previous.invalidate();
        }
        info!(seed = %seed.id, "seed unlocked");
        Ok(handle)
    }

    /// The current handle for `encrypted_seed_id`, if one was unlocked.
    /// The handle may already be invalid.
    pub fn get(&self, encrypted_seed_id: &str) -> Option<SeedRef> {
        self.handles.get(encrypted_seed_id).map(|h| h.value().clone())
    }

    /// Revoke and forget one identity's handle. Used on identity deletion and
    /// explicit lock.
    pub fn invalidate(&self, encrypted_seed_id: &str) {
        if let Some((_, handle)) = self.handles.remove(encrypted_seed_id) {
            handle.invalidate();
        }
    }

    /// Revoke every handle, e.g. when the app goes to the background.
    ///
    /// Handles stay registered so a later sign reports
    /// [`SeedError::Invalidated`] rather than [`SeedError::Locked`].
    pub fn invalidate_all(&self) {
        for entry in self.handles.iter() {
            entry.value().invalidate();
        }
        info!(count = self.handles.len(), "all seed handles invalidated");
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
