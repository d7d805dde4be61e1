//! # Payload Classifier
//!
//! Decides what a decoded or reassembled payload is asking the signer to do.
//!
//! ```text
//! Substrate  53 | crypto | action | public key | payload | genesis hash (32)
//! Ethereum   45 | action | address (20) | payload
//! ```
//!
//! Substrate crypto bytes are `00` ed25519, `01` sr25519 and `02` ecdsa (the
//! only one with a 33-byte key). Substrate actions are `00` mortal
//! transaction, `01` pre-hashed payload, `02` immortal transaction and `03`
//! message. Ethereum actions are `00` hash, `01` RLP transaction and `02`
//! personal message.
//!
//! The classifier works out the bytes that will actually be signed
//! ([`UnsignedRequest::signable`]) so the signing step never has to look at
//! the envelope again.

use parity_scale_codec::{Compact, Decode};
use rlp::Rlp;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::decoder::{EthereumLegacyRequest, LegacyAction};
use super::reassembly::CompletedPayload;
use crate::account::SenderQuery;
use crate::address::{
    normalize_ethereum_address, ss58_encode, ss58_reencode, substrate_account_id, AddressPayload,
};
use crate::config::{
    ECDSA_PUBLIC_KEY_LENGTH, ETHEREUM_ADDRESS_LENGTH, ETHEREUM_SIGN_HASH, ETHEREUM_SIGN_MESSAGE,
    ETHEREUM_SIGN_TRANSACTION, GENESIS_HASH_LENGTH, HASH_OUTPUT_LENGTH,
    OVERSIZED_PAYLOAD_THRESHOLD, PUBLIC_KEY_LENGTH, SUBSTRATE_SIGN_HASH, SUBSTRATE_SIGN_IMMORTAL,
    SUBSTRATE_SIGN_MESSAGE, SUBSTRATE_SIGN_MORTAL, UOS_ETHEREUM, UOS_SUBSTRATE,
};
use crate::crypto::hash::{blake2b_256, ethereum_message_hash, keccak256};
use crate::crypto::SignatureScheme;
use crate::network::{NetworkProtocol, NetworkRegistry, NetworkSpec};

/// Position of the chain id in an EIP-155 unsigned transaction list.
const RLP_CHAIN_ID_INDEX: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("unknown network {0}")]
    UnknownSenderNetwork(String),

    #[error("unsupported request: {0}")]
    UnsupportedIntent(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Input to [`classify`]: every decoded shape except a raw frame, which must
/// go through the reassembler first.
#[derive(Debug)]
pub enum Classifiable {
    Address(AddressPayload),
    NetworkAdd(NetworkSpec),
    EthereumLegacy(EthereumLegacyRequest),
    Completed(CompletedPayload),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Transaction,
    ImmortalTransaction,
    Hash,
    Message,
}

/// A request to sign, before the sender account has been resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedRequest {
    pub sender: SenderQuery,
    pub scheme: SignatureScheme,
    pub kind: RequestKind,
    /// Payload as the user should review it: length prefix stripped, not hashed.
    pub unsigned_payload: Vec<u8>,
    /// The exact bytes handed to the key backend.
    pub signable: Vec<u8>,
    /// `signable` is a blake2b-256 digest of an oversized payload.
    pub is_oversized: bool,
}

impl UnsignedRequest {
    pub fn is_ethereum(&self) -> bool {
        self.scheme == SignatureScheme::Ethereum
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    ResolveAddressOnly(AddressPayload),
    AddNetwork(NetworkSpec),
    SignRequest(UnsignedRequest),
}

/// Show a Substrate address in the SS58 format of the network it was scanned
/// for. Addresses that do not decode, or name no known network, pass through.
fn address_for_network(mut address: AddressPayload, networks: &NetworkRegistry) -> AddressPayload {
    if address.protocol != NetworkProtocol::Substrate {
        return address;
    }
    let network = address.network_key.as_deref().and_then(|key| networks.substrate(key));
    if let Some(network) = network {
        if let Ok(reencoded) = ss58_reencode(&address.address, network.prefix) {
            address.address = reencoded;
        }
    }
    address
}

/// Classify with the default oversize threshold.
pub fn classify(input: Classifiable, networks: &NetworkRegistry) -> Result<Intent, ClassifyError> {
    classify_with_threshold(input, networks, OVERSIZED_PAYLOAD_THRESHOLD)
}

/// Classify, hashing Substrate payloads longer than `oversize_threshold`.
pub fn classify_with_threshold(
    input: Classifiable,
    networks: &NetworkRegistry,
    oversize_threshold: usize,
) -> Result<Intent, ClassifyError> {
    match input {
        Classifiable::Address(address) => {
            Ok(Intent::ResolveAddressOnly(address_for_network(address, networks)))
        }
        Classifiable::NetworkAdd(spec) => Ok(Intent::AddNetwork(spec)),
        Classifiable::EthereumLegacy(request) => {
            let (action, payload) = match request.action {
                LegacyAction::SignTransaction { rlp } => (ETHEREUM_SIGN_TRANSACTION, rlp),
                LegacyAction::SignData { data } => (ETHEREUM_SIGN_MESSAGE, data.into_bytes()),
            };
            ethereum_request(request.account, action, payload, networks).map(Intent::SignRequest)
        }
        Classifiable::Completed(payload) => {
            let bytes = payload.into_bytes();
            let request = match bytes.first() {
                Some(&UOS_SUBSTRATE) => substrate_request(&bytes, networks, oversize_threshold)?,
                Some(&UOS_ETHEREUM) => ethereum_envelope(&bytes, networks)?,
                Some(other) => {
                    return Err(ClassifyError::UnsupportedIntent(format!(
                        "unknown payload prefix 0x{other:02x}"
                    )))
                }
                None => return Err(ClassifyError::Malformed("empty payload".into())),
            };
            Ok(Intent::SignRequest(request))
        }
    }
}

// ---------------------------------------------------------------------------
// Substrate
// ---------------------------------------------------------------------------

fn substrate_request(
    bytes: &[u8],
    networks: &NetworkRegistry,
    oversize_threshold: usize,
) -> Result<UnsignedRequest, ClassifyError> {
    let (&crypto, rest) = bytes[1..]
        .split_first()
        .ok_or_else(|| ClassifyError::Malformed("missing crypto byte".into()))?;
    let scheme = SignatureScheme::from_substrate_byte(crypto).ok_or_else(|| {
        ClassifyError::UnsupportedIntent(format!("unknown crypto byte 0x{crypto:02x}"))
    })?;
    let (&action, rest) = rest
        .split_first()
        .ok_or_else(|| ClassifyError::Malformed("missing action byte".into()))?;

    let key_length = match scheme {
        SignatureScheme::Ecdsa => ECDSA_PUBLIC_KEY_LENGTH,
        _ => PUBLIC_KEY_LENGTH,
    };
    if rest.len() < key_length + GENESIS_HASH_LENGTH {
        return Err(ClassifyError::Malformed("substrate payload is truncated".into()));
    }
    let (public_key, rest) = rest.split_at(key_length);
    let (payload, genesis) = rest.split_at(rest.len() - GENESIS_HASH_LENGTH);

    let network_key = format!("0x{}", hex::encode(genesis));
    let network = networks
        .substrate(&network_key)
        .ok_or_else(|| ClassifyError::UnknownSenderNetwork(network_key.clone()))?;

    let account_id = substrate_account_id(scheme, public_key);
    let address = ss58_encode(&account_id, network.prefix)
        .map_err(|e| ClassifyError::Malformed(e.to_string()))?;

    let (kind, unsigned_payload) = match action {
        SUBSTRATE_SIGN_MORTAL => (RequestKind::Transaction, strip_compact_prefix(payload)?),
        SUBSTRATE_SIGN_IMMORTAL => (
            RequestKind::ImmortalTransaction,
            strip_compact_prefix(payload)?,
        ),
        SUBSTRATE_SIGN_HASH => {
            if payload.len() != HASH_OUTPUT_LENGTH {
                return Err(ClassifyError::Malformed(format!(
                    "pre-hashed payload must be {HASH_OUTPUT_LENGTH} bytes, got {}",
                    payload.len()
                )));
            }
            (RequestKind::Hash, payload.to_vec())
        }
        SUBSTRATE_SIGN_MESSAGE => (RequestKind::Message, payload.to_vec()),
        other => {
            return Err(ClassifyError::UnsupportedIntent(format!(
                "unknown substrate action 0x{other:02x}"
            )))
        }
    };

    let is_oversized = kind != RequestKind::Hash && unsigned_payload.len() > oversize_threshold;
    let signable = if is_oversized {
        blake2b_256(&unsigned_payload).to_vec()
    } else {
        unsigned_payload.clone()
    };

    debug!(
        ?scheme,
        ?kind,
        network = %network.title,
        len = unsigned_payload.len(),
        is_oversized,
        "classified substrate request"
    );

    Ok(UnsignedRequest {
        sender: SenderQuery {
            protocol: NetworkProtocol::Substrate,
            address,
            network_key: Some(network_key),
        },
        scheme,
        kind,
        unsigned_payload,
        signable,
        is_oversized,
    })
}

/// Drop the SCALE compact length prefix from a transaction payload.
fn strip_compact_prefix(payload: &[u8]) -> Result<Vec<u8>, ClassifyError> {
    let mut input = payload;
    Compact::<u32>::decode(&mut input)
        .map_err(|e| ClassifyError::Malformed(format!("bad length prefix: {e}")))?;
    Ok(input.to_vec())
}

// ---------------------------------------------------------------------------
// Ethereum
// ---------------------------------------------------------------------------

fn ethereum_envelope(
    bytes: &[u8],
    networks: &NetworkRegistry,
) -> Result<UnsignedRequest, ClassifyError> {
    if bytes.len() < 2 + ETHEREUM_ADDRESS_LENGTH {
        return Err(ClassifyError::Malformed("ethereum payload is truncated".into()));
    }
    let action = bytes[1];
    let address = hex::encode(&bytes[2..2 + ETHEREUM_ADDRESS_LENGTH]);
    let payload = bytes[2 + ETHEREUM_ADDRESS_LENGTH..].to_vec();
    ethereum_request(address, action, payload, networks)
}

fn ethereum_request(
    address: String,
    action: u8,
    payload: Vec<u8>,
    networks: &NetworkRegistry,
) -> Result<UnsignedRequest, ClassifyError> {
    let address = normalize_ethereum_address(&address);

    let (kind, signable, network_key) = match action {
        ETHEREUM_SIGN_HASH => {
            if payload.len() != HASH_OUTPUT_LENGTH {
                return Err(ClassifyError::Malformed(format!(
                    "hash must be {HASH_OUTPUT_LENGTH} bytes, got {}",
                    payload.len()
                )));
            }
            (RequestKind::Hash, payload.clone(), None)
        }
        ETHEREUM_SIGN_TRANSACTION => {
            let chain_id = rlp_chain_id(&payload)?;
            let network = networks
                .ethereum(chain_id)
                .ok_or_else(|| ClassifyError::UnknownSenderNetwork(chain_id.to_string()))?;
            debug!(chain_id, network = %network.title, "ethereum transaction");
            (
                RequestKind::Transaction,
                keccak256(&payload).to_vec(),
                Some(chain_id.to_string()),
            )
        }
        ETHEREUM_SIGN_MESSAGE => (
            RequestKind::Message,
            ethereum_message_hash(&payload).to_vec(),
            None,
        ),
        other => {
            return Err(ClassifyError::UnsupportedIntent(format!(
                "unknown ethereum action 0x{other:02x}"
            )))
        }
    };

    debug!(?kind, len = payload.len(), "classified ethereum request");

    Ok(UnsignedRequest {
        sender: SenderQuery {
            protocol: NetworkProtocol::Ethereum,
            address,
            network_key,
        },
        scheme: SignatureScheme::Ethereum,
        kind,
        unsigned_payload: payload,
        signable,
        is_oversized: false,
    })
}

/// Chain id of an unsigned EIP-155 transaction: the seventh list item.
fn rlp_chain_id(payload: &[u8]) -> Result<u64, ClassifyError> {
    let rlp = Rlp::new(payload);
    let items = rlp
        .item_count()
        .map_err(|e| ClassifyError::Malformed(format!("transaction is not an RLP list: {e}")))?;
    if items <= RLP_CHAIN_ID_INDEX {
        return Err(ClassifyError::Malformed("transaction carries no chain id".into()));
    }
    rlp.at(RLP_CHAIN_ID_INDEX)
        .and_then(|item| item.as_val::<u64>())
        .map_err(|e| ClassifyError::Malformed(format!("bad chain id: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::registry::{ETHEREUM_GOERLI_CHAIN_ID, KUSAMA_GENESIS};
    use parity_scale_codec::Encode;
    use rlp::RlpStream;

    fn kusama_genesis() -> Vec<u8> {
        hex::decode(&KUSAMA_GENESIS[2..]).unwrap()
    }

    fn substrate_envelope(
        crypto: u8,
        action: u8,
        key: &[u8],
        payload: &[u8],
        genesis: &[u8],
    ) -> CompletedPayload {
        let mut bytes = vec![UOS_SUBSTRATE, crypto, action];
        bytes.extend_from_slice(key);
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(genesis);
        CompletedPayload::new(bytes)
    }

    fn with_length_prefix(call: &[u8]) -> Vec<u8> {
        let mut out = Compact(call.len() as u32).encode();
        out.extend_from_slice(call);
        out
    }

    fn unsigned_tx(chain_id: u64) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        stream.append(&7u64); // nonce
        stream.append(&20_000_000_000u64); // gas price
        stream.append(&21_000u64); // gas
        stream.append(&vec![0x11u8; 20]); // to
        stream.append(&1_000_000u64); // value
        stream.append_empty_data(); // data
        stream.append(&chain_id);
        stream.append_empty_data();
        stream.append_empty_data();
        stream.out().to_vec()
    }

    fn sign_request(intent: Intent) -> UnsignedRequest {
        match intent {
            Intent::SignRequest(request) => request,
            other => panic!("expected sign request, got {other:?}"),
        }
    }

    #[test]
    fn substrate_mortal_transaction_strips_length_prefix() {
        let registry = NetworkRegistry::with_defaults();
        let call = vec![0x05, 0x00, 0x01, 0x02];
        let input = substrate_envelope(
            0x00,
            0x00,
            &[7u8; 32],
            &with_length_prefix(&call),
            &kusama_genesis(),
        );

        let request = sign_request(classify(Classifiable::Completed(input), &registry).unwrap());
        assert_eq!(request.scheme, SignatureScheme::Ed25519);
        assert_eq!(request.kind, RequestKind::Transaction);
        assert_eq!(request.unsigned_payload, call);
        assert_eq!(request.signable, call);
        assert!(!request.is_oversized);
        assert_eq!(request.sender.network_key.as_deref(), Some(KUSAMA_GENESIS));
        assert_eq!(
            request.sender.address,
            ss58_encode(&[7u8; 32], 2).unwrap()
        );
    }

    #[test]
    fn oversized_substrate_payload_is_hashed() {
        let registry = NetworkRegistry::with_defaults();
        let call = vec![0xAB; 300];
        let input = substrate_envelope(
            0x00,
            0x02,
            &[7u8; 32],
            &with_length_prefix(&call),
            &kusama_genesis(),
        );

        let request = sign_request(classify(Classifiable::Completed(input), &registry).unwrap());
        assert_eq!(request.kind, RequestKind::ImmortalTransaction);
        assert!(request.is_oversized);
        assert_eq!(request.signable, blake2b_256(&call).to_vec());
    }

    #[test]
    fn ecdsa_sender_uses_hashed_account_id() {
        let registry = NetworkRegistry::with_defaults();
        let key = [3u8; 33];
        let input = substrate_envelope(0x02, 0x03, &key, b"hello", &kusama_genesis());

        let request = sign_request(classify(Classifiable::Completed(input), &registry).unwrap());
        assert_eq!(request.scheme, SignatureScheme::Ecdsa);
        assert_eq!(request.kind, RequestKind::Message);
        assert_eq!(
            request.sender.address,
            ss58_encode(&blake2b_256(&key), 2).unwrap()
        );
    }

    #[test]
    fn prehashed_payload_must_be_a_digest() {
        let registry = NetworkRegistry::with_defaults();
        let input = substrate_envelope(0x00, 0x01, &[7u8; 32], &[1u8; 31], &kusama_genesis());
        assert!(matches!(
            classify(Classifiable::Completed(input), &registry),
            Err(ClassifyError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_genesis_is_unknown_network() {
        let registry = NetworkRegistry::with_defaults();
        let input =
            substrate_envelope(0x00, 0x00, &[7u8; 32], &with_length_prefix(b"x"), &[0xEE; 32]);
        let err = classify(Classifiable::Completed(input), &registry).unwrap_err();
        assert_eq!(err, ClassifyError::UnknownSenderNetwork(format!("0x{}", "ee".repeat(32))));
    }

    #[test]
    fn truncated_and_unknown_envelopes() {
        let registry = NetworkRegistry::with_defaults();
        let truncated = CompletedPayload::new(vec![UOS_SUBSTRATE, 0x00, 0x00, 1, 2, 3]);
        assert!(matches!(
            classify(Classifiable::Completed(truncated), &registry),
            Err(ClassifyError::Malformed(_))
        ));

        let unknown = CompletedPayload::new(vec![0x99, 0x00]);
        assert!(matches!(
            classify(Classifiable::Completed(unknown), &registry),
            Err(ClassifyError::UnsupportedIntent(_))
        ));

        let bad_action = substrate_envelope(0x00, 0x09, &[7u8; 32], b"", &kusama_genesis());
        assert!(matches!(
            classify(Classifiable::Completed(bad_action), &registry),
            Err(ClassifyError::UnsupportedIntent(_))
        ));
    }

    #[test]
    fn ethereum_transaction_reads_chain_id() {
        let registry = NetworkRegistry::with_defaults();
        let tx = unsigned_tx(ETHEREUM_GOERLI_CHAIN_ID);
        let mut bytes = vec![UOS_ETHEREUM, ETHEREUM_SIGN_TRANSACTION];
        bytes.extend_from_slice(&[0xAA; 20]);
        bytes.extend_from_slice(&tx);

        let request = sign_request(
            classify(Classifiable::Completed(CompletedPayload::new(bytes)), &registry).unwrap(),
        );
        assert!(request.is_ethereum());
        assert_eq!(request.sender.address, "aa".repeat(20));
        assert_eq!(request.sender.network_key.as_deref(), Some("5"));
        assert_eq!(request.signable, keccak256(&tx).to_vec());
    }

    #[test]
    fn ethereum_transaction_on_unknown_chain() {
        let registry = NetworkRegistry::with_defaults();
        let legacy = EthereumLegacyRequest {
            account: "aa".repeat(20),
            action: LegacyAction::SignTransaction { rlp: unsigned_tx(137) },
        };
        assert_eq!(
            classify(Classifiable::EthereumLegacy(legacy), &registry),
            Err(ClassifyError::UnknownSenderNetwork("137".into()))
        );
    }

    #[test]
    fn legacy_sign_data_hashes_personal_message() {
        let registry = NetworkRegistry::with_defaults();
        let legacy = EthereumLegacyRequest {
            account: "bb".repeat(20),
            action: LegacyAction::SignData { data: "hello".into() },
        };
        let request =
            sign_request(classify(Classifiable::EthereumLegacy(legacy), &registry).unwrap());
        assert_eq!(request.kind, RequestKind::Message);
        assert_eq!(request.signable, ethereum_message_hash(b"hello").to_vec());
        assert_eq!(request.sender.network_key, None);
    }

    #[test]
    fn address_and_network_add_pass_through() {
        let registry = NetworkRegistry::with_defaults();
        let address = AddressPayload {
            protocol: NetworkProtocol::Ethereum,
            address: "cc".repeat(20),
            network_key: None,
        };
        assert_eq!(
            classify(Classifiable::Address(address.clone()), &registry),
            Ok(Intent::ResolveAddressOnly(address))
        );
    }

    #[test]
    fn substrate_address_takes_scanned_network_format() {
        let registry = NetworkRegistry::with_defaults();
        let account_id = [0x2a; 32];
        let scanned = AddressPayload {
            protocol: NetworkProtocol::Substrate,
            address: ss58_encode(&account_id, 42).unwrap(),
            network_key: Some(KUSAMA_GENESIS.to_string()),
        };
        let Intent::ResolveAddressOnly(shown) =
            classify(Classifiable::Address(scanned.clone()), &registry).unwrap()
        else {
            panic!("expected an address intent");
        };
        assert_eq!(shown.address, ss58_encode(&account_id, 2).unwrap());
        assert_eq!(shown.network_key, scanned.network_key);

        let undecodable = AddressPayload {
            address: "Fxyz".into(),
            ..scanned
        };
        assert_eq!(
            classify(Classifiable::Address(undecodable.clone()), &registry),
            Ok(Intent::ResolveAddressOnly(undecodable))
        );
    }
}
