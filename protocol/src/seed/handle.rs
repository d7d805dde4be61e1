//! The [`SeedRef`] capability.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::request::SigningRequest;
use super::SeedError;
use crate::crypto::KeyBackend;

struct SeedSlot {
    encrypted_seed_id: String,
    valid: AtomicBool,
    seed: Mutex<Option<Zeroizing<Vec<u8>>>>,
    backend: Arc<dyn KeyBackend>,
}

/// A revocable handle to one decrypted seed.
///
/// Clones share the same slot: invalidating any of them invalidates all.
/// The seed bytes never leave the handle; callers only get signatures.
#[derive(Clone)]
pub struct SeedRef {
    slot: Arc<SeedSlot>,
}

impl SeedRef {
    pub(crate) fn new(
        encrypted_seed_id: String,
        seed: Zeroizing<Vec<u8>>,
        backend: Arc<dyn KeyBackend>,
    ) -> Self {
        Self {
            slot: Arc::new(SeedSlot {
                encrypted_seed_id,
                valid: AtomicBool::new(true),
                seed: Mutex::new(Some(seed)),
                backend,
            }),
        }
    }

    pub fn encrypted_seed_id(&self) -> &str {
        &self.slot.encrypted_seed_id
    }

    pub fn is_valid(&self) -> bool {
        self.slot.valid.load(Ordering::SeqCst)
    }

    /// Revoke the handle and wipe the seed. Idempotent and irreversible.
    pub fn invalidate(&self) {
        if self.slot.valid.swap(false, Ordering::SeqCst) {
            info!(seed = %self.slot.encrypted_seed_id, "seed handle invalidated");
        }
        self.slot.seed.lock().take();
    }

    /// Sign `request.signable` with the key at `request.sender_path`.
    ///
    /// The key backend runs on a blocking worker. If the handle is
    /// invalidated while that is in progress, the signature is discarded and
    /// [`SeedError::Invalidated`] is returned instead.
    pub async fn sign(&self, request: &SigningRequest) -> Result<Vec<u8>, SeedError> {
        if !self.is_valid() {
            return Err(SeedError::Invalidated);
        }

        // Copy out under the lock so invalidate() never waits on a signature.
        let seed = self
            .slot
            .seed
            .lock()
            .as_ref()
            .map(|s| Zeroizing::new(s.to_vec()))
            .ok_or(SeedError::Invalidated)?;

        let backend = Arc::clone(&self.slot.backend);
        let path = request.sender_path.clone();
        let scheme = request.scheme;
        let message = request.signable.clone();

        debug!(%scheme, len = message.len(), "signing");
        let signature = tokio::task::spawn_blocking(move || {
            backend.sign(&seed, &path, scheme, &message)
        })
        .await
        .map_err(|e| SeedError::SigningFailed(format!("signing task failed: {e}")))??;

        if !self.is_valid() {
            return Err(SeedError::Invalidated);
        }
        Ok(signature)
    }
}

impl fmt::Debug for SeedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedRef")
            .field("encrypted_seed_id", &self.slot.encrypted_seed_id)
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyError, SignatureScheme, SoftwareKeyBackend};
    use crate::scanner::RequestKind;
    use std::time::Duration;

    fn request(scheme: SignatureScheme) -> SigningRequest {
        SigningRequest {
            sender_account_id: "alice".into(),
            sender_path: "//kusama".into(),
            network_key: "k".into(),
            encrypted_seed_id: "seed-1".into(),
            unsigned_payload: b"payload".to_vec(),
            is_ethereum: false,
            scheme,
            kind: RequestKind::Message,
            signable: b"payload".to_vec(),
        }
    }

    fn handle(backend: Arc<dyn KeyBackend>) -> SeedRef {
        SeedRef::new("seed-1".into(), Zeroizing::new(b"seed".to_vec()), backend)
    }

    struct SlowBackend;

    impl KeyBackend for SlowBackend {
        fn public_key(&self, _: &[u8], _: &str, _: SignatureScheme) -> Result<Vec<u8>, KeyError> {
            Ok(vec![0; 32])
        }

        fn sign(
            &self,
            seed: &[u8],
            path: &str,
            scheme: SignatureScheme,
            message: &[u8],
        ) -> Result<Vec<u8>, KeyError> {
            std::thread::sleep(Duration::from_millis(200));
            SoftwareKeyBackend.sign(seed, path, scheme, message)
        }
    }

    #[tokio::test]
    async fn signs_repeatedly_while_valid() {
        let seed = handle(Arc::new(SoftwareKeyBackend));
        let first = seed.sign(&request(SignatureScheme::Ed25519)).await.unwrap();
        let second = seed.sign(&request(SignatureScheme::Ed25519)).await.unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
        assert!(seed.is_valid());
    }

    #[tokio::test]
    async fn invalidation_is_shared_by_clones() {
        let seed = handle(Arc::new(SoftwareKeyBackend));
        let clone = seed.clone();
        clone.invalidate();
        clone.invalidate();
        assert!(!seed.is_valid());
        assert_eq!(
            seed.sign(&request(SignatureScheme::Ed25519)).await,
            Err(SeedError::Invalidated)
        );
    }

    #[tokio::test]
    async fn invalidation_during_sign_discards_signature() {
        let seed = handle(Arc::new(SlowBackend));
        let in_flight = seed.clone();
        let task =
            tokio::spawn(async move { in_flight.sign(&request(SignatureScheme::Ed25519)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        seed.invalidate();

        assert_eq!(task.await.unwrap(), Err(SeedError::Invalidated));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_reported() {
        let seed = handle(Arc::new(SoftwareKeyBackend));
        assert_eq!(
            seed.sign(&request(SignatureScheme::Sr25519)).await,
            Err(SeedError::UnsupportedScheme(SignatureScheme::Sr25519))
        );
        assert!(seed.is_valid());
    }

    #[test]
    fn debug_output_hides_seed() {
        let seed = handle(Arc::new(SoftwareKeyBackend));
        let rendered = format!("{seed:?}");
        assert!(rendered.contains("seed-1"));
        assert!(!rendered.contains("[115, 101, 101, 100]"));
    }
}
