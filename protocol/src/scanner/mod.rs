//! # Scanner Pipeline
//!
//! The synchronous half of air-gapped signing: everything between a camera
//! read and a classified intent. None of it suspends or touches key material.
//!
//! ```text
//! RawScanEvent ──▶ decode ──▶ DecodedPayload
//!                               │
//!            SubstrateFrame ────┴──▶ Reassembler ──▶ CompletedPayload
//!                                                         │
//!                              everything else ───────────┴──▶ classify ──▶ Intent
//! ```

pub mod classifier;
pub mod decoder;
pub mod event;
pub mod reassembly;

pub use classifier::{
    classify, classify_with_threshold, Classifiable, ClassifyError, Intent, RequestKind,
    UnsignedRequest,
};
pub use decoder::{
    decode, DecodeError, DecodedPayload, EthereumLegacyRequest, LegacyAction, SubstrateFrame,
};
pub use event::{strip_byte_mode, wrap_byte_mode, DuplicateFilter, RawScanEvent};
pub use reassembly::{
    CompletedPayload, ReassemblyOutcome, ReassemblyProgress, ReassemblyState, Reassembler,
};
