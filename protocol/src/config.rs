//! # Wire-Format Constants & Scanner Configuration
//!
//! Every magic byte of the offline-signer QR protocol lives here. These values
//! are fixed by the scanners already deployed in the field, so changing any of
//! them is a protocol break, not a refactor.
//!
//! Runtime-tunable knobs live in [`ScannerConfig`], which can be loaded from a
//! TOML file by the CLI.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// QR Byte-Mode Envelope
// ---------------------------------------------------------------------------

/// Mode indicator nibble for QR byte mode. Scanners hand us the raw codeword
/// stream, so the first hex digit of a binary payload is always `4`.
pub const QR_BYTE_MODE_NIBBLE: char = '4';

/// Terminator nibble that closes the data segment.
pub const QR_TERMINATOR_NIBBLE: char = '0';

/// Trailing pad codewords, alternated by the encoder to fill the symbol.
pub const QR_PAD_PAIR: &str = "ec11";

/// A lone pad codeword left over when the fill length is odd.
pub const QR_PAD_SINGLE: &str = "ec";

// ---------------------------------------------------------------------------
// Multi-Frame Marker
// ---------------------------------------------------------------------------

/// First byte of every framed payload.
pub const MULTIPART_MARKER: u8 = 0x00;

/// `marker (1) | frame_count (2, BE) | frame_index (2, BE)`.
pub const FRAME_HEADER_LENGTH: usize = 5;

/// Part data of frame 0 must not start with these bytes: `00` would be read as
/// a nested frame header and `7B` (`{`) as legacy JSON.
pub const FORBIDDEN_FIRST_PART_BYTES: [u8; 2] = [0x00, 0x7B];

/// Frame counts are carried as `u16`.
pub const MAX_FRAME_COUNT: u32 = u16::MAX as u32;

// ---------------------------------------------------------------------------
// UOS Payload Prefixes
// ---------------------------------------------------------------------------

/// `S`: Substrate payload.
pub const UOS_SUBSTRATE: u8 = 0x53;

/// `E`: Ethereum payload.
pub const UOS_ETHEREUM: u8 = 0x45;

/// Substrate crypto bytes.
pub const CRYPTO_ED25519: u8 = 0x00;
pub const CRYPTO_SR25519: u8 = 0x01;
pub const CRYPTO_ECDSA: u8 = 0x02;

/// Substrate action bytes.
pub const SUBSTRATE_SIGN_MORTAL: u8 = 0x00;
pub const SUBSTRATE_SIGN_HASH: u8 = 0x01;
pub const SUBSTRATE_SIGN_IMMORTAL: u8 = 0x02;
pub const SUBSTRATE_SIGN_MESSAGE: u8 = 0x03;

/// Ethereum action bytes.
pub const ETHEREUM_SIGN_HASH: u8 = 0x00;
pub const ETHEREUM_SIGN_TRANSACTION: u8 = 0x01;
pub const ETHEREUM_SIGN_MESSAGE: u8 = 0x02;

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// Ed25519 / sr25519 public keys.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Compressed secp256k1 public keys.
pub const ECDSA_PUBLIC_KEY_LENGTH: usize = 33;

/// Genesis hashes trail every Substrate payload.
pub const GENESIS_HASH_LENGTH: usize = 32;

/// Ethereum account identifiers.
pub const ETHEREUM_ADDRESS_LENGTH: usize = 20;

/// Digest size for blake2b-256 and keccak-256.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Payloads above this many bytes are signed by their blake2b-256 digest.
/// Matches the runtime rule in Substrate's `SignedPayload`.
pub const OVERSIZED_PAYLOAD_THRESHOLD: usize = 256;

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes.
pub const AES_NONCE_LENGTH: usize = 12;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Tunable scanner behaviour.
///
/// Defaults match what the deployed app does. Operators only touch these when
/// replaying recorded sessions through the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Drop an event whose raw bytes equal the immediately preceding event.
    pub suppress_duplicate_frames: bool,

    /// Largest frame count a session will accept.
    pub max_frames: u32,

    /// Payload size above which Substrate payloads are signed by digest.
    pub oversize_threshold: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            suppress_duplicate_frames: true,
            max_frames: MAX_FRAME_COUNT,
            oversize_threshold: OVERSIZED_PAYLOAD_THRESHOLD,
        }
    }
}
