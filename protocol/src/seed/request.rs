use crate::account::FoundAccount;
use crate::crypto::SignatureScheme;
use crate::scanner::{RequestKind, UnsignedRequest};

/// Everything needed for one sign operation.
///
/// Built when the sender account has been resolved and dropped as soon as the
/// signature exists, or the session is cancelled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningRequest {
    /// SS58 address or lowercase Ethereum hex.
    pub sender_account_id: String,
    /// Derivation path of the sender within its seed.
    pub sender_path: String,
    pub network_key: String,
    pub encrypted_seed_id: String,
    pub unsigned_payload: Vec<u8>,
    pub is_ethereum: bool,
    pub scheme: SignatureScheme,
    pub kind: RequestKind,
    /// Exactly what the key backend signs.
    pub signable: Vec<u8>,
}

impl SigningRequest {
    pub fn new(request: UnsignedRequest, account: FoundAccount) -> Self {
        let is_ethereum = request.is_ethereum();
        Self {
            sender_account_id: request.sender.address,
            sender_path: account.path,
            network_key: account.network_key,
            encrypted_seed_id: account.encrypted_seed_id,
            unsigned_payload: request.unsigned_payload,
            is_ethereum,
            scheme: request.scheme,
            kind: request.kind,
            signable: request.signable,
        }
    }
}
