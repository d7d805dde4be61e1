//! Camera reads and the QR byte-mode envelope around them.

use serde::{Deserialize, Serialize};

use super::decoder::DecodeError;
use crate::config::{QR_BYTE_MODE_NIBBLE, QR_PAD_PAIR, QR_PAD_SINGLE, QR_TERMINATOR_NIBBLE};

/// A single successful QR read.
///
/// `raw_bytes` are the byte-mode codewords the camera library reports: mode
/// nibble, length field, data, terminator nibble and pad bytes. `text_payload`
/// is the library's own text decoding of the same symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScanEvent {
    pub raw_bytes: Vec<u8>,
    pub text_payload: String,
}

impl RawScanEvent {
    pub fn new(raw_bytes: Vec<u8>, text_payload: impl Into<String>) -> Self {
        Self {
            raw_bytes,
            text_payload: text_payload.into(),
        }
    }

    /// Build an event from the hex string most scanner libraries report.
    pub fn from_hex(raw_hex: &str, text_payload: impl Into<String>) -> Result<Self, DecodeError> {
        let raw_hex = raw_hex.trim();
        let raw_hex = raw_hex.strip_prefix("0x").unwrap_or(raw_hex);
        let raw_bytes = hex::decode(raw_hex)
            .map_err(|e| DecodeError::Malformed(format!("raw data is not hex: {e}")))?;
        Ok(Self::new(raw_bytes, text_payload))
    }

    /// A text-only read (addresses, JSON).
    pub fn text(text_payload: impl Into<String>) -> Self {
        Self::new(Vec::new(), text_payload)
    }

    /// Wrap already-stripped payload bytes in a byte-mode envelope, the way a
    /// QR encoder would. Used to replay recorded payloads.
    pub fn from_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::new(wrap_byte_mode(payload)?, String::new()))
    }
}

/// Remove the QR byte-mode envelope from raw codewords.
///
/// Works on the hex rendering because the mode and terminator are nibbles,
/// not bytes. The length field is either 8 or 16 bits wide depending on the
/// symbol version; whichever one matches the remaining data wins.
pub fn strip_byte_mode(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    let mut data = hex::encode(raw);
    if data.ends_with(QR_PAD_SINGLE) {
        data.truncate(data.len() - QR_PAD_SINGLE.len());
    }
    while data.ends_with(QR_PAD_PAIR) {
        data.truncate(data.len() - QR_PAD_PAIR.len());
    }

    if !data.starts_with(QR_BYTE_MODE_NIBBLE) {
        return Err(DecodeError::Malformed("not a byte-mode QR code".into()));
    }
    if !data.ends_with(QR_TERMINATOR_NIBBLE) || data.len() < 2 {
        return Err(DecodeError::Malformed("missing QR terminator".into()));
    }
    let body = &data[1..data.len() - 1];

    let length8 = body.get(..2).and_then(|h| usize::from_str_radix(h, 16).ok());
    let length16 = body.get(..4).and_then(|h| usize::from_str_radix(h, 16).ok());

    let payload_hex = match (length8, length16) {
        (Some(len), _) if len * 2 + 2 == body.len() => &body[2..],
        (_, Some(len)) if len * 2 + 4 == body.len() => &body[4..],
        _ => return Err(DecodeError::Malformed("QR length field does not match data".into())),
    };

    hex::decode(payload_hex).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Inverse of [`strip_byte_mode`]. Picks the 8-bit length field when the
/// payload fits and pads with `EC 11`.
///
/// The widest length field is 16 bits, so payloads over 65535 bytes have no
/// byte-mode encoding and are rejected.
pub fn wrap_byte_mode(payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let length = if payload.len() <= u8::MAX as usize {
        format!("{:02x}", payload.len())
    } else if payload.len() <= u16::MAX as usize {
        format!("{:04x}", payload.len())
    } else {
        return Err(DecodeError::Malformed(format!(
            "payload of {} bytes exceeds the byte-mode limit of {}",
            payload.len(),
            u16::MAX
        )));
    };
    let mut data = format!(
        "{QR_BYTE_MODE_NIBBLE}{length}{}{QR_TERMINATOR_NIBBLE}",
        hex::encode(payload)
    );
    data.push_str(QR_PAD_PAIR);
    hex::decode(data).map_err(|e| DecodeError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Duplicate Suppression
// ---------------------------------------------------------------------------

/// Remembers the previous event so a camera holding still on one code does
/// not feed the same frame in a loop.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    last: Option<RawScanEvent>,
}

impl DuplicateFilter {
    /// Returns `true` if `event` equals the previous one. Otherwise remembers
    /// it and returns `false`.
    pub fn is_duplicate(&mut self, event: &RawScanEvent) -> bool {
        if self.last.as_ref() == Some(event) {
            return true;
        }
        self.last = Some(event.clone());
        false
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_eight_bit_length_envelope() {
        // 4 | 03 | 53 01 02 | 0 | ec 11
        let wrapped = wrap_byte_mode(&[0x53, 0x01, 0x02]).unwrap();
        assert_eq!(hex::encode(&wrapped), "4035301020ec11");
        assert_eq!(strip_byte_mode(&wrapped).unwrap(), vec![0x53, 0x01, 0x02]);
    }

    #[test]
    fn strips_odd_padding() {
        let raw = hex::decode("4035301020ec11ec").unwrap();
        assert_eq!(strip_byte_mode(&raw).unwrap(), vec![0x53, 0x01, 0x02]);
    }

    #[test]
    fn strips_sixteen_bit_length_envelope() {
        let payload = vec![0xAB; 300];
        let wrapped = wrap_byte_mode(&payload).unwrap();
        assert!(hex::encode(&wrapped).starts_with("4012c"));
        assert_eq!(strip_byte_mode(&wrapped).unwrap(), payload);
    }

    #[test]
    fn largest_payload_still_wraps() {
        let payload = vec![0x11; u16::MAX as usize];
        let wrapped = wrap_byte_mode(&payload).unwrap();
        assert!(hex::encode(&wrapped).starts_with("4ffff"));
        assert_eq!(strip_byte_mode(&wrapped).unwrap(), payload);
    }

    #[test]
    fn payload_past_sixteen_bit_length_is_rejected() {
        let payload = vec![0x53; 70_000];
        assert!(matches!(wrap_byte_mode(&payload), Err(DecodeError::Malformed(_))));
        assert!(matches!(RawScanEvent::from_payload(&payload), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn empty_input_is_reported() {
        assert_eq!(strip_byte_mode(&[]), Err(DecodeError::EmptyInput));
    }

    #[test]
    fn wrong_mode_nibble_is_malformed() {
        let raw = hex::decode("2035301020ec11").unwrap();
        assert!(matches!(strip_byte_mode(&raw), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn mismatched_length_is_malformed() {
        let raw = hex::decode("4095301020ec11").unwrap();
        assert!(matches!(strip_byte_mode(&raw), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn from_hex_accepts_prefix() {
        let event = RawScanEvent::from_hex("0x4035301020ec11", "").unwrap();
        assert_eq!(event.raw_bytes.len(), 7);
        assert!(RawScanEvent::from_hex("zz", "").is_err());
    }

    #[test]
    fn duplicate_filter_only_drops_adjacent_repeats() {
        let mut filter = DuplicateFilter::default();
        let a = RawScanEvent::text("a");
        let b = RawScanEvent::text("b");
        assert!(!filter.is_duplicate(&a));
        assert!(filter.is_duplicate(&a));
        assert!(!filter.is_duplicate(&b));
        assert!(!filter.is_duplicate(&a));
        filter.reset();
        assert!(!filter.is_duplicate(&a));
    }
}
