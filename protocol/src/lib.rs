// Copyright (c) 2026 Airgap Signer Contributors. MIT License.
// See LICENSE for details.

//! # Airgap Protocol: Offline Signing Core
//!
//! The signer never touches a network. Everything it learns arrives through
//! the camera as QR codes, and everything it produces leaves as a QR code on
//! screen. This crate is the part in between: it turns camera reads into
//! signing requests and signing requests into signatures, without ever
//! letting seed material out of a revocable handle.
//!
//! ## Architecture
//!
//! - **scanner**: Decode reads, reassemble multi-part payloads, classify them.
//! - **session**: The orchestrator that drives one scan screen end to end.
//! - **seed**: Revocable seed handles and PIN-sealed seeds at rest.
//! - **account**: The boundary to wherever wallets and accounts live.
//! - **network**: Chain parameters the signer knows about.
//! - **address**: SS58 and Ethereum address handling.
//! - **crypto**: Hashes, key backends, AES-GCM sealing.
//! - **config**: Wire-format constants and scanner tuning.
//!
//! ## Data flow
//!
//! ```text
//! camera ─▶ RawScanEvent ─▶ decode ─▶ reassemble ─▶ classify
//!                                                      │
//!        QR renderer ◀─ SignedResult ◀─ SeedRef::sign ◀─ resolve sender
//! ```

pub mod account;
pub mod address;
pub mod config;
pub mod crypto;
pub mod network;
pub mod scanner;
pub mod seed;
pub mod session;

pub use account::{AccountResolver, WalletStore};
pub use config::ScannerConfig;
pub use network::NetworkRegistry;
pub use scanner::{decode, RawScanEvent};
pub use seed::{EncryptedSeed, SeedRef, SeedRefs};
pub use session::{ScanOutcome, ScanSession, SessionError, SessionState, SignedResult};
