//! # Signing Orchestrator
//!
//! A [`ScanSession`] lives exactly as long as the scan screen is focused. It
//! owns the reassembly buffer and the in-flight signing request, and drives
//! each camera read through decode, reassembly, classification, account
//! resolution and signing.
//!
//! ## Concurrency
//!
//! Events are processed one at a time. A busy flag drops reads that arrive
//! while an earlier one is still in progress, so two frames can never race
//! into the reassembler. Only account resolution and signing suspend.
//!
//! The session is `Clone` so the UI can call [`ScanSession::cancel`] or
//! [`ScanSession::on_background`] while [`ScanSession::on_scan`] is pending.
//! Cancellation bumps an epoch on a `watch` channel; anything awaiting at
//! that moment is abandoned and `on_scan` returns
//! [`SessionError::Interrupted`]. A signature that completes after
//! backgrounding is thrown away, never rendered.
//!
//! ## Failure policy
//!
//! Any error moves the session to [`SessionState::Failed`] with a user-facing
//! message, clears the reassembly buffer and drops the signing request.
//! Nothing is retried; the user restarts explicitly.

pub mod error;
pub mod result;
pub mod state;

pub use error::SessionError;
pub use result::SignedResult;
pub use state::SessionState;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::account::{AccountResolver, ResolveError};
use crate::address::AddressPayload;
use crate::config::ScannerConfig;
use crate::network::{NetworkRegistry, NetworkSpec};
use crate::scanner::{
    classify_with_threshold, decode, Classifiable, DecodeError, DecodedPayload, DuplicateFilter,
    Intent, RawScanEvent, ReassemblyOutcome, ReassemblyProgress, Reassembler, UnsignedRequest,
};
use crate::seed::{SeedError, SeedRefs, SigningRequest};

/// What happened to one scan event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "camelCase")]
pub enum ScanOutcome {
    /// Same read as the previous one; ignored.
    Suppressed,
    /// An earlier read is still being processed; ignored.
    Busy,
    /// A frame of a multi-part payload was taken; more are needed.
    Progress(ReassemblyProgress),
    /// A bare address was scanned.
    Address(AddressPayload),
    /// An add-network request was scanned. Registering it is up to the caller.
    AddNetwork(NetworkSpec),
    /// A request was signed.
    Signed(SignedResult),
}

// Synchronous result of decoding and reassembly.
enum Step {
    Pending(ReassemblyProgress),
    Ready(Classifiable),
}

// Where an event goes after classification.
enum Next {
    Sign(UnsignedRequest),
    Finished(ScanOutcome),
}

#[derive(Default)]
struct SessionCore {
    state: SessionState,
    reassembler: Reassembler,
    duplicates: DuplicateFilter,
    request: Option<SigningRequest>,
    last_result: Option<SignedResult>,
}

impl SessionCore {
    fn set_state(&mut self, session: &Uuid, state: SessionState) {
        if self.state != state {
            info!(%session, from = %self.state, to = %state, "session state changed");
            self.state = state;
        }
    }

    fn clear_progress(&mut self) {
        self.reassembler.clear_multipart_progress();
        self.request = None;
    }
}

struct SessionInner {
    id: Uuid,
    config: ScannerConfig,
    networks: Arc<RwLock<NetworkRegistry>>,
    resolver: Arc<dyn AccountResolver>,
    seeds: Arc<SeedRefs>,
    core: Mutex<SessionCore>,
    busy: AtomicBool,
    cancel_epoch: watch::Sender<u64>,
    started_at: Mutex<DateTime<Utc>>,
}

/// Clears the busy flag when processing of one event ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One scan screen's worth of state.
#[derive(Clone)]
pub struct ScanSession {
    inner: Arc<SessionInner>,
}

impl ScanSession {
    pub fn new(
        config: ScannerConfig,
        networks: Arc<RwLock<NetworkRegistry>>,
        resolver: Arc<dyn AccountResolver>,
        seeds: Arc<SeedRefs>,
    ) -> Self {
        let (cancel_epoch, _) = watch::channel(0);
        let id = Uuid::new_v4();
        debug!(session = %id, "scan session created");
        Self {
            inner: Arc::new(SessionInner {
                id,
                config,
                networks,
                resolver,
                seeds,
                core: Mutex::new(SessionCore::default()),
                busy: AtomicBool::new(false),
                cancel_epoch,
                started_at: Mutex::new(Utc::now()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state.clone()
    }

    pub fn progress(&self) -> ReassemblyProgress {
        self.inner.core.lock().reassembler.progress()
    }

    /// `true` while a signing request is held.
    pub fn has_pending_request(&self) -> bool {
        self.inner.core.lock().request.is_some()
    }

    /// The most recent signature. Survives cancellation.
    pub fn last_result(&self) -> Option<SignedResult> {
        self.inner.core.lock().last_result.clone()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Process one camera read end to end.
    pub async fn on_scan(&self, event: RawScanEvent) -> Result<ScanOutcome, SessionError> {
        let span = info_span!("scan_session", session = %self.inner.id);
        self.process(event).instrument(span).await
    }

    async fn process(&self, event: RawScanEvent) -> Result<ScanOutcome, SessionError> {
        let inner = &*self.inner;
        if inner.busy.swap(true, Ordering::AcqRel) {
            debug!("still processing, dropping scan");
            return Ok(ScanOutcome::Busy);
        }
        let _busy = BusyGuard(&inner.busy);

        let (epoch, unsigned) = {
            let mut core = inner.core.lock();
            match core.state {
                SessionState::Done | SessionState::Failed { .. } => {
                    return Err(SessionError::RestartRequired)
                }
                SessionState::Cancelled => {
                    *core = SessionCore {
                        last_result: core.last_result.take(),
                        ..SessionCore::default()
                    };
                    *inner.started_at.lock() = Utc::now();
                    info!("starting fresh after cancellation");
                }
                _ => {}
            }

            // Cancellation bumps the epoch under this lock, so the value read
            // here belongs to the session this event runs in.
            let epoch = *inner.cancel_epoch.borrow();

            if inner.config.suppress_duplicate_frames && core.duplicates.is_duplicate(&event) {
                return Ok(ScanOutcome::Suppressed);
            }

            match self.classify_event(&mut core, &event) {
                Ok(Next::Sign(unsigned)) => (epoch, unsigned),
                Ok(Next::Finished(outcome)) => return Ok(outcome),
                Err(err) => return Err(self.fail_locked(&mut core, err)),
            }
        };

        match self.sign_flow(epoch, unsigned).await {
            Ok(result) => self.finish(epoch, result),
            Err(err) => Err(self.fail(epoch, err)),
        }
    }

    /// Everything up to the first suspension point. Returns the request to
    /// sign, or the outcome if the event ends here.
    fn classify_event(
        &self,
        core: &mut SessionCore,
        event: &RawScanEvent,
    ) -> Result<Next, SessionError> {
        let inner = &*self.inner;

        let classifiable = match self.decode_step(core, event)? {
            Step::Pending(progress) => {
                debug!(
                    completed = progress.completed,
                    total = progress.total,
                    missing = progress.missing.len(),
                    "awaiting frames"
                );
                return Ok(Next::Finished(ScanOutcome::Progress(progress)));
            }
            Step::Ready(classifiable) => classifiable,
        };

        core.set_state(&inner.id, SessionState::Classifying);
        let intent = classify_with_threshold(
            classifiable,
            &inner.networks.read(),
            inner.config.oversize_threshold,
        )?;

        match intent {
            Intent::ResolveAddressOnly(address) => {
                core.clear_progress();
                core.set_state(&inner.id, SessionState::Done);
                Ok(Next::Finished(ScanOutcome::Address(address)))
            }
            Intent::AddNetwork(spec) => {
                core.clear_progress();
                core.set_state(&inner.id, SessionState::Done);
                Ok(Next::Finished(ScanOutcome::AddNetwork(spec)))
            }
            Intent::SignRequest(unsigned) => {
                core.set_state(&inner.id, SessionState::ResolvingAccount);
                Ok(Next::Sign(unsigned))
            }
        }
    }

    fn decode_step(
        &self,
        core: &mut SessionCore,
        event: &RawScanEvent,
    ) -> Result<Step, SessionError> {
        let inner = &*self.inner;
        let decoded = decode(event, &inner.networks.read())?;

        let classifiable = match decoded {
            DecodedPayload::SubstrateFrame(frame) => {
                if frame.frame_count > inner.config.max_frames {
                    return Err(DecodeError::Malformed(format!(
                        "{} frames exceeds the limit of {}",
                        frame.frame_count, inner.config.max_frames
                    ))
                    .into());
                }
                match core.reassembler.accept(frame) {
                    ReassemblyOutcome::Pending(progress) => {
                        core.set_state(&inner.id, SessionState::AwaitingFrames);
                        return Ok(Step::Pending(progress));
                    }
                    ReassemblyOutcome::Complete { payload } => Classifiable::Completed(payload),
                }
            }
            DecodedPayload::Address(address) => Classifiable::Address(address),
            DecodedPayload::NetworkAdd(spec) => Classifiable::NetworkAdd(spec),
            DecodedPayload::EthereumLegacy(request) => Classifiable::EthereumLegacy(request),
        };
        Ok(Step::Ready(classifiable))
    }

    /// Resolve the sender, then sign. Both steps are abandoned on cancel.
    async fn sign_flow(
        &self,
        epoch: u64,
        unsigned: UnsignedRequest,
    ) -> Result<SignedResult, SessionError> {
        let inner = &*self.inner;
        let sender = unsigned.sender.clone();

        let found = self
            .until_cancelled(epoch, inner.resolver.resolve_sender(&sender))
            .await?
            .ok_or_else(|| ResolveError::NoMatchingWallet(sender.address.clone()))?;
        let wallet = self
            .until_cancelled(epoch, inner.resolver.wallet_for_seed(&found.encrypted_seed_id))
            .await?
            .ok_or_else(|| ResolveError::NoMatchingWallet(sender.address.clone()))?;

        let request = SigningRequest::new(unsigned, found);
        {
            let mut core = inner.core.lock();
            if *inner.cancel_epoch.borrow() != epoch {
                return Err(SessionError::Interrupted);
            }
            core.request = Some(request.clone());
            core.set_state(&inner.id, SessionState::Signing);
        }

        // Looked up here, not earlier, so a handle revoked while resolving
        // is still caught.
        let seed = inner
            .seeds
            .get(&request.encrypted_seed_id)
            .ok_or_else(|| SeedError::Locked(wallet.name.clone()))?;
        if !seed.is_valid() {
            return Err(SeedError::Invalidated.into());
        }

        let signature = self.until_cancelled(epoch, seed.sign(&request)).await??;
        Ok(SignedResult::new(request.scheme, signature))
    }

    /// Await `future` unless the session is cancelled first.
    async fn until_cancelled<F: Future>(
        &self,
        epoch: u64,
        future: F,
    ) -> Result<F::Output, SessionError> {
        let mut epochs = self.inner.cancel_epoch.subscribe();
        if *epochs.borrow_and_update() != epoch {
            return Err(SessionError::Interrupted);
        }

        let cancelled = async move {
            // Dropping the sender cannot happen while the session is alive.
            let _ = epochs.wait_for(|current| *current != epoch).await.map(|_| ());
        };

        tokio::select! {
            output = future => Ok(output),
            _ = cancelled => Err(SessionError::Interrupted),
        }
    }

    fn finish(&self, epoch: u64, result: SignedResult) -> Result<ScanOutcome, SessionError> {
        let inner = &*self.inner;
        let mut core = inner.core.lock();
        if *inner.cancel_epoch.borrow() != epoch {
            warn!("signature finished after cancellation, discarding");
            return Err(SessionError::Interrupted);
        }
        core.clear_progress();
        core.last_result = Some(result.clone());
        core.set_state(&inner.id, SessionState::Done);

        let elapsed = Utc::now() - *inner.started_at.lock();
        info!(elapsed_ms = elapsed.num_milliseconds(), "payload signed");
        Ok(ScanOutcome::Signed(result))
    }

    fn fail(&self, epoch: u64, err: SessionError) -> SessionError {
        let mut core = self.inner.core.lock();
        if err == SessionError::Interrupted || *self.inner.cancel_epoch.borrow() != epoch {
            debug!("session interrupted");
            return SessionError::Interrupted;
        }
        self.fail_locked(&mut core, err)
    }

    fn fail_locked(&self, core: &mut SessionCore, err: SessionError) -> SessionError {
        warn!(error = %err, "scan session failed");
        core.clear_progress();
        core.set_state(
            &self.inner.id,
            SessionState::Failed {
                message: err.user_message(),
            },
        );
        err
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Abandon the current scan. Clears reassembly and any signing request,
    /// leaves seed handles alone. Returns `false` if the session was already
    /// `Done`.
    pub fn cancel(&self, reason: &str) -> bool {
        let cancelled = self.cancel_locked(&mut self.inner.core.lock(), reason);
        if cancelled {
            info!(session = %self.inner.id, %reason, "scan session cancelled");
        }
        cancelled
    }

    fn cancel_locked(&self, core: &mut SessionCore, reason: &str) -> bool {
        if core.state == SessionState::Done {
            debug!(%reason, "cancel ignored, session is done");
            return false;
        }
        core.clear_progress();
        core.duplicates.reset();
        core.set_state(&self.inner.id, SessionState::Cancelled);
        self.inner.cancel_epoch.send_modify(|epoch| *epoch += 1);
        true
    }

    /// The app moved to the background: cancel and revoke every seed handle.
    pub fn on_background(&self) {
        self.cancel("app backgrounded");
        self.inner.seeds.invalidate_all();
    }

    /// Return to `Idle` after `Done` or `Failed`.
    pub fn restart(&self) {
        let inner = &*self.inner;
        {
            let mut core = inner.core.lock();
            core.clear_progress();
            core.duplicates.reset();
            core.set_state(&inner.id, SessionState::Idle);
            inner.cancel_epoch.send_modify(|epoch| *epoch += 1);
        }
        *inner.started_at.lock() = Utc::now();
    }
}
