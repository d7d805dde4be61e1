//! # Byte Decoder
//!
//! Turns one [`RawScanEvent`] into exactly one [`DecodedPayload`]. The shape
//! is decided here, once; everything downstream matches on the enum.
//!
//! Detection order matters and mirrors what deployed wallets emit:
//!
//! 1. account-id strings (`0x…`, `substrate:…`, `ethereum:…`)
//! 2. JSON with a `genesisHash`: an add-network request
//! 3. any other JSON: a legacy Ethereum signing request
//! 4. binary: a frame header or a bare UOS payload

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::event::{strip_byte_mode, RawScanEvent};
use crate::address::{
    is_address_string, normalize_ethereum_address, parse_account_id, AddressPayload,
};
use crate::config::{
    FORBIDDEN_FIRST_PART_BYTES, FRAME_HEADER_LENGTH, MULTIPART_MARKER, UOS_ETHEREUM, UOS_SUBSTRATE,
};
use crate::network::{is_genesis_hash, NetworkRegistry, NetworkSpec};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("scanned QR code is empty")]
    EmptyInput,

    #[error("scanned QR code is malformed: {0}")]
    Malformed(String),
}

/// One part of a (possibly single-part) binary payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateFrame {
    pub frame_index: u32,
    pub frame_count: u32,
    #[serde(with = "hex::serde")]
    pub part_data: Vec<u8>,
}

impl SubstrateFrame {
    pub fn single(part_data: Vec<u8>) -> Self {
        Self {
            frame_index: 0,
            frame_count: 1,
            part_data,
        }
    }

    /// Encode the frame header the way an online wallet does. Inverse of the
    /// binary branch of [`decode`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_HEADER_LENGTH + self.part_data.len());
        out.push(MULTIPART_MARKER);
        out.extend_from_slice(&(self.frame_count as u16).to_be_bytes());
        out.extend_from_slice(&(self.frame_index as u16).to_be_bytes());
        out.extend_from_slice(&self.part_data);
        out
    }
}

/// What a legacy Ethereum JSON request asks for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegacyAction {
    /// Sign the keccak hash of an RLP-encoded transaction.
    SignTransaction {
        #[serde(with = "hex::serde")]
        rlp: Vec<u8>,
    },
    /// Sign a personal message.
    SignData { data: String },
}

/// `{"action": "signTransaction" | "signData", "data": {...}}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumLegacyRequest {
    /// Lowercase hex, no `0x`.
    pub account: String,
    pub action: LegacyAction,
}

/// The shape of a single scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DecodedPayload {
    Address(AddressPayload),
    NetworkAdd(NetworkSpec),
    EthereumLegacy(EthereumLegacyRequest),
    SubstrateFrame(SubstrateFrame),
}

// Wire form of legacy requests. Adjacently tagged: the action names the
// variant and `data` holds its fields.
#[derive(Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
enum LegacyJson {
    SignTransaction { account: String, rlp: String },
    SignData { account: String, data: String },
}

impl TryFrom<LegacyJson> for EthereumLegacyRequest {
    type Error = DecodeError;

    fn try_from(json: LegacyJson) -> Result<Self, Self::Error> {
        match json {
            LegacyJson::SignTransaction { account, rlp } => {
                let rlp = rlp.strip_prefix("0x").unwrap_or(&rlp);
                let rlp = hex::decode(rlp)
                    .map_err(|e| DecodeError::Malformed(format!("rlp is not hex: {e}")))?;
                Ok(Self {
                    account: normalize_ethereum_address(&account),
                    action: LegacyAction::SignTransaction { rlp },
                })
            }
            LegacyJson::SignData { account, data } => Ok(Self {
                account: normalize_ethereum_address(&account),
                action: LegacyAction::SignData { data },
            }),
        }
    }
}

/// Decode one scan event.
///
/// The registry is only read, to tag add-network requests for networks the
/// signer already knows.
pub fn decode(
    raw: &RawScanEvent,
    networks: &NetworkRegistry,
) -> Result<DecodedPayload, DecodeError> {
    let text = raw.text_payload.trim();

    if is_address_string(text) {
        if let Some(address) = parse_account_id(text) {
            debug!(protocol = ?address.protocol, "decoded address");
            return Ok(DecodedPayload::Address(address));
        }
    }

    if text.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
            return decode_json(json, networks);
        }
    }

    decode_binary(&raw.raw_bytes)
}

fn decode_json(
    json: serde_json::Value,
    networks: &NetworkRegistry,
) -> Result<DecodedPayload, DecodeError> {
    let genesis_hash = json.get("genesisHash").and_then(|v| v.as_str());

    if let Some(genesis_hash) = genesis_hash.filter(|g| is_genesis_hash(g)) {
        let known = networks.substrate(genesis_hash).is_some();
        let spec: NetworkSpec = serde_json::from_value(json)
            .map_err(|e| DecodeError::Malformed(format!("network spec: {e}")))?;
        debug!(known, title = %spec.title, "decoded add-network request");
        return Ok(DecodedPayload::NetworkAdd(spec));
    }

    let legacy: LegacyJson = serde_json::from_value(json)
        .map_err(|e| DecodeError::Malformed(format!("unrecognised JSON request: {e}")))?;
    let request = EthereumLegacyRequest::try_from(legacy)?;
    debug!("decoded legacy ethereum request");
    Ok(DecodedPayload::EthereumLegacy(request))
}

fn decode_binary(raw: &[u8]) -> Result<DecodedPayload, DecodeError> {
    let bytes = strip_byte_mode(raw)?;

    match bytes.first() {
        None => Err(DecodeError::EmptyInput),
        Some(&MULTIPART_MARKER) => decode_frame(&bytes).map(DecodedPayload::SubstrateFrame),
        Some(&UOS_SUBSTRATE) | Some(&UOS_ETHEREUM) => {
            debug!(len = bytes.len(), "decoded bare payload");
            Ok(DecodedPayload::SubstrateFrame(SubstrateFrame::single(bytes)))
        }
        Some(other) => Err(DecodeError::Malformed(format!(
            "unknown leading byte 0x{other:02x}"
        ))),
    }
}

fn decode_frame(bytes: &[u8]) -> Result<SubstrateFrame, DecodeError> {
    if bytes.len() < FRAME_HEADER_LENGTH {
        return Err(DecodeError::Malformed("truncated frame header".into()));
    }

    let frame_count = u16::from_be_bytes([bytes[1], bytes[2]]) as u32;
    let frame_index = u16::from_be_bytes([bytes[3], bytes[4]]) as u32;
    let part_data = bytes[FRAME_HEADER_LENGTH..].to_vec();

    if frame_count == 0 {
        return Err(DecodeError::Malformed("frame count is zero".into()));
    }
    if frame_index >= frame_count {
        return Err(DecodeError::Malformed(format!(
            "frame index {frame_index} out of range for {frame_count} frames"
        )));
    }
    if frame_count > 1
        && frame_index == 0
        && part_data
            .first()
            .is_some_and(|b| FORBIDDEN_FIRST_PART_BYTES.contains(b))
    {
        return Err(DecodeError::Malformed(
            "first frame starts with a reserved byte".into(),
        ));
    }

    debug!(frame_index, frame_count, len = part_data.len(), "decoded frame");
    Ok(SubstrateFrame {
        frame_index,
        frame_count,
        part_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::registry::KUSAMA_GENESIS;
    use crate::network::NetworkProtocol;

    fn registry() -> NetworkRegistry {
        NetworkRegistry::with_defaults()
    }

    fn binary(payload: &[u8]) -> RawScanEvent {
        RawScanEvent::from_payload(payload).unwrap()
    }

    #[test]
    fn empty_raw_input_is_empty_input() {
        let event = RawScanEvent::new(Vec::new(), "");
        assert_eq!(decode(&event, &registry()), Err(DecodeError::EmptyInput));
    }

    #[test]
    fn decodes_address_text() {
        let event = RawScanEvent::text(format!("substrate:Fxyz:{KUSAMA_GENESIS}"));
        match decode(&event, &registry()).unwrap() {
            DecodedPayload::Address(a) => {
                assert_eq!(a.protocol, NetworkProtocol::Substrate);
                assert_eq!(a.address, "Fxyz");
                assert_eq!(a.network_key.as_deref(), Some(KUSAMA_GENESIS));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decodes_network_add_json() {
        let json = serde_json::json!({
            "genesisHash": format!("0x{}", "12".repeat(32)),
            "title": "Dev",
            "prefix": 42,
            "decimals": 12,
            "unit": "DEV",
            "color": "#fff",
        })
        .to_string();
        match decode(&RawScanEvent::text(json), &registry()).unwrap() {
            DecodedPayload::NetworkAdd(spec) => assert_eq!(spec.prefix, 42),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn network_add_missing_fields_is_malformed() {
        let json = format!(r#"{{"genesisHash":"0x{}"}}"#, "12".repeat(32));
        assert!(matches!(
            decode(&RawScanEvent::text(json), &registry()),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn decodes_legacy_ethereum_json() {
        let json = r#"{"action":"signTransaction","data":{"account":"0xABCD","rlp":"c0"}}"#;
        match decode(&RawScanEvent::text(json), &registry()).unwrap() {
            DecodedPayload::EthereumLegacy(req) => {
                assert_eq!(req.account, "abcd");
                assert_eq!(req.action, LegacyAction::SignTransaction { rlp: vec![0xc0] });
            }
            other => panic!("unexpected {other:?}"),
        }

        let json = r#"{"action":"signData","data":{"account":"abcd","data":"hello"}}"#;
        assert!(matches!(
            decode(&RawScanEvent::text(json), &registry()).unwrap(),
            DecodedPayload::EthereumLegacy(EthereumLegacyRequest {
                action: LegacyAction::SignData { .. },
                ..
            })
        ));
    }

    #[test]
    fn unknown_json_is_malformed() {
        let json = r#"{"action":"launchRockets"}"#;
        assert!(matches!(
            decode(&RawScanEvent::text(json), &registry()),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn decodes_multipart_frame_header() {
        let frame = SubstrateFrame {
            frame_index: 1,
            frame_count: 3,
            part_data: vec![0xAA, 0xBB],
        };
        let decoded = decode(&binary(&frame.to_bytes()), &registry()).unwrap();
        assert_eq!(decoded, DecodedPayload::SubstrateFrame(frame));
    }

    #[test]
    fn bare_uos_payload_is_single_frame() {
        let decoded = decode(&binary(&[UOS_SUBSTRATE, 0x00, 0x03]), &registry()).unwrap();
        assert_eq!(
            decoded,
            DecodedPayload::SubstrateFrame(SubstrateFrame::single(vec![UOS_SUBSTRATE, 0x00, 0x03]))
        );
    }

    #[test]
    fn rejects_bad_frame_headers() {
        let cases: [&[u8]; 4] = [
            &[0x00, 0x00, 0x02],                   // truncated
            &[0x00, 0x00, 0x00, 0x00, 0x00, 0x53], // zero count
            &[0x00, 0x00, 0x02, 0x00, 0x02, 0x53], // index == count
            &[0x00, 0x00, 0x02, 0x00, 0x00, 0x7B], // reserved first byte
        ];
        for case in cases {
            assert!(
                matches!(decode(&binary(case), &registry()), Err(DecodeError::Malformed(_))),
                "accepted {case:02x?}"
            );
        }
    }

    #[test]
    fn single_frame_may_start_with_zero() {
        let decoded = decode(&binary(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x00]), &registry());
        assert!(decoded.is_ok());
    }

    #[test]
    fn unknown_leading_byte_is_malformed() {
        assert!(matches!(
            decode(&binary(&[0x99, 0x01]), &registry()),
            Err(DecodeError::Malformed(_))
        ));
    }
}
