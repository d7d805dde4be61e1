//! # Addresses
//!
//! Two address families show up in scanned QR codes:
//!
//! - **SS58** for Substrate chains: `base58(prefix || account_id || checksum)`
//!   where the checksum is the first two bytes of
//!   `blake2b_512("SS58PRE" || prefix || account_id)`.
//! - **Ethereum** 20-byte addresses, handled as lowercase hex without `0x`.
//!
//! The wallet also scans plain "account id" strings, the same ones it shows
//! as QR codes on its receive screen:
//!
//! ```text
//! substrate:<ss58>:<genesis-hash>
//! ethereum:0x<hex>@<chain-id>
//! 0x<hex>
//! ```

use k256::ecdsa::VerifyingKey as Secp256k1PublicKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ETHEREUM_ADDRESS_LENGTH, HASH_OUTPUT_LENGTH};
use crate::crypto::hash::{blake2b_256, blake2b_512_multi, keccak256};
use crate::crypto::SignatureScheme;
use crate::network::NetworkProtocol;

const SS58_CONTEXT: &[u8] = b"SS58PRE";
const SS58_CHECKSUM_LENGTH: usize = 2;

/// Highest prefix the two-byte SS58 form can carry.
pub const SS58_MAX_PREFIX: u16 = 16_383;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is not valid base58")]
    InvalidBase58,

    #[error("address has an unexpected length")]
    InvalidLength,

    #[error("address checksum does not match")]
    InvalidChecksum,

    #[error("SS58 prefix {0} is out of range")]
    InvalidPrefix(u16),

    #[error("not a secp256k1 public key")]
    InvalidPublicKey,
}

// ---------------------------------------------------------------------------
// SS58
// ---------------------------------------------------------------------------

fn ss58_prefix_bytes(prefix: u16) -> Result<Vec<u8>, AddressError> {
    match prefix {
        0..=63 => Ok(vec![prefix as u8]),
        64..=SS58_MAX_PREFIX => {
            let first = ((prefix & 0b0000_0000_1111_1100) >> 2) as u8 | 0b0100_0000;
            let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
            Ok(vec![first, second])
        }
        _ => Err(AddressError::InvalidPrefix(prefix)),
    }
}

fn ss58_checksum(body: &[u8]) -> [u8; SS58_CHECKSUM_LENGTH] {
    let hash = blake2b_512_multi(&[SS58_CONTEXT, body]);
    [hash[0], hash[1]]
}

/// Encode a 32-byte account id as an SS58 address.
pub fn ss58_encode(account_id: &[u8], prefix: u16) -> Result<String, AddressError> {
    let mut body = ss58_prefix_bytes(prefix)?;
    body.extend_from_slice(account_id);
    let checksum = ss58_checksum(&body);
    body.extend_from_slice(&checksum);
    Ok(bs58::encode(body).into_string())
}

/// Decode an SS58 address into `(prefix, account_id)`, verifying the checksum.
pub fn ss58_decode(address: &str) -> Result<(u16, Vec<u8>), AddressError> {
    let data = bs58::decode(address)
        .into_vec()
        .map_err(|_| AddressError::InvalidBase58)?;

    let (prefix, prefix_len) = match data.first() {
        Some(&b) if b < 64 => (b as u16, 1),
        Some(&b) if b < 128 => {
            let second = *data.get(1).ok_or(AddressError::InvalidLength)?;
            let lower = (b << 2) | (second >> 6);
            let upper = second & 0b0011_1111;
            (lower as u16 | ((upper as u16) << 8), 2)
        }
        Some(_) => return Err(AddressError::InvalidBase58),
        None => return Err(AddressError::InvalidLength),
    };

    if data.len() != prefix_len + HASH_OUTPUT_LENGTH + SS58_CHECKSUM_LENGTH {
        return Err(AddressError::InvalidLength);
    }

    let (body, checksum) = data.split_at(data.len() - SS58_CHECKSUM_LENGTH);
    if ss58_checksum(body) != checksum {
        return Err(AddressError::InvalidChecksum);
    }

    Ok((prefix, body[prefix_len..].to_vec()))
}

/// Re-encode an SS58 address under another network's prefix.
pub fn ss58_reencode(address: &str, prefix: u16) -> Result<String, AddressError> {
    let (_, account_id) = ss58_decode(address)?;
    ss58_encode(&account_id, prefix)
}

/// Account id Substrate derives from a public key. Ecdsa keys are 33 bytes
/// and get hashed down to 32; everything else is used as-is.
pub fn substrate_account_id(scheme: SignatureScheme, public_key: &[u8]) -> Vec<u8> {
    match scheme {
        SignatureScheme::Ecdsa => blake2b_256(public_key).to_vec(),
        _ => public_key.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Ethereum
// ---------------------------------------------------------------------------

/// Ethereum address of a SEC1-encoded secp256k1 public key, as lowercase hex
/// without `0x`.
pub fn ethereum_address(public_key: &[u8]) -> Result<String, AddressError> {
    let key = Secp256k1PublicKey::from_sec1_bytes(public_key)
        .map_err(|_| AddressError::InvalidPublicKey)?;
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    Ok(hex::encode(&hash[HASH_OUTPUT_LENGTH - ETHEREUM_ADDRESS_LENGTH..]))
}

/// Normalize an Ethereum address for comparison: strip `0x`, lowercase.
pub fn normalize_ethereum_address(address: &str) -> String {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Account Id Strings
// ---------------------------------------------------------------------------

/// An address scanned on its own, without anything to sign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub protocol: NetworkProtocol,
    /// SS58 for Substrate, lowercase hex without `0x` for Ethereum.
    pub address: String,
    /// Genesis hash or chain id, when the scanned string carried one.
    pub network_key: Option<String>,
}

/// `true` if `text` has one of the account-id prefixes.
pub fn is_address_string(text: &str) -> bool {
    text.starts_with("0x") || text.starts_with("substrate:") || text.starts_with("ethereum:")
}

/// Parse an account-id string. Returns `None` when `text` is not one.
pub fn parse_account_id(text: &str) -> Option<AddressPayload> {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("substrate:") {
        let mut parts = rest.splitn(2, ':');
        let address = parts.next().filter(|a| !a.is_empty())?;
        let network_key = parts.next().filter(|n| !n.is_empty()).map(str::to_lowercase);
        return Some(AddressPayload {
            protocol: NetworkProtocol::Substrate,
            address: address.to_string(),
            network_key,
        });
    }

    let (rest, protocol_prefixed) = match text.strip_prefix("ethereum:") {
        Some(rest) => (rest, true),
        None if text.starts_with("0x") => (text, false),
        None => return None,
    };

    let mut parts = rest.splitn(2, '@');
    let address = normalize_ethereum_address(parts.next()?);
    if address.is_empty() {
        return None;
    }
    let network_key = if protocol_prefixed {
        parts.next().filter(|n| !n.is_empty()).map(str::to_string)
    } else {
        None
    };

    Some(AddressPayload {
        protocol: NetworkProtocol::Ethereum,
        address,
        network_key,
    })
}

/// Render an account id string for a resolved address.
pub fn format_account_id(payload: &AddressPayload) -> String {
    match (payload.protocol, &payload.network_key) {
        (NetworkProtocol::Substrate, Some(key)) => format!("substrate:{}:{}", payload.address, key),
        (NetworkProtocol::Substrate, None) => format!("substrate:{}", payload.address),
        (NetworkProtocol::Ethereum, Some(key)) => format!("ethereum:0x{}@{}", payload.address, key),
        (NetworkProtocol::Ethereum, None) => format!("ethereum:0x{}", payload.address),
    }
}
