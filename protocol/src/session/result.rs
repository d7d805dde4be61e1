use serde::Serialize;

use crate::crypto::SignatureScheme;

/// A finished signature, ready for the QR renderer. Not sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedResult {
    /// Signature as the key backend produced it.
    #[serde(with = "hex::serde")]
    pub signature_bytes: Vec<u8>,
    /// Lowercase hex. Substrate signatures carry their `MultiSignature`
    /// scheme byte in front; Ethereum signatures are `r || s || v`.
    pub renderable_payload: String,
}

impl SignedResult {
    pub fn new(scheme: SignatureScheme, signature_bytes: Vec<u8>) -> Self {
        let renderable_payload = match scheme.multi_signature_prefix() {
            Some(prefix) => {
                let mut prefixed = Vec::with_capacity(signature_bytes.len() + 1);
                prefixed.push(prefix);
                prefixed.extend_from_slice(&signature_bytes);
                hex::encode(prefixed)
            }
            None => hex::encode(&signature_bytes),
        };
        Self {
            signature_bytes,
            renderable_payload,
        }
    }
}
