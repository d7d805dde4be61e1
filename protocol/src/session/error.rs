use thiserror::Error;

use crate::account::ResolveError;
use crate::scanner::{ClassifyError, DecodeError};
use crate::seed::SeedError;

/// Everything that can end a scan session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    /// The session was cancelled or the app backgrounded while awaiting.
    #[error("session was interrupted")]
    Interrupted,

    /// The session already finished or failed.
    #[error("session has ended, restart scanning")]
    RestartRequired,
}

impl SessionError {
    /// The single line shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Decode(_) => "This QR code could not be read. Please rescan.".into(),
            SessionError::Classify(ClassifyError::UnknownSenderNetwork(network)) => format!(
                "This request is for an unknown network ({network}). Add the network, then rescan."
            ),
            SessionError::Classify(ClassifyError::UnsupportedIntent(_)) => {
                "This QR code is not a request the signer supports.".into()
            }
            SessionError::Classify(ClassifyError::Malformed(_)) => {
                "The scanned payload is damaged. Please rescan.".into()
            }
            SessionError::Resolve(ResolveError::NoMatchingWallet(address)) => {
                format!("No wallet on this device holds the account {address}.")
            }
            SessionError::Seed(SeedError::Locked(wallet)) => {
                format!("Unlock {wallet} and scan again.")
            }
            SessionError::Seed(SeedError::Invalidated) => {
                "The wallet was locked before signing finished. Unlock it and scan again.".into()
            }
            SessionError::Seed(SeedError::UnsupportedScheme(scheme)) => {
                format!("{scheme} signing is not available on this device.")
            }
            SessionError::Seed(_) => "Signing failed. Please try again.".into(),
            SessionError::Interrupted => "Signing was interrupted.".into(),
            SessionError::RestartRequired => "Restart scanning to continue.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_network_message_names_network() {
        let err = SessionError::from(ClassifyError::UnknownSenderNetwork("0xabc".into()));
        assert!(err.user_message().contains("0xabc"));
    }

    #[test]
    fn key_material_errors_stay_vague() {
        let err = SessionError::from(SeedError::SigningFailed("secret detail".into()));
        assert!(!err.user_message().contains("secret detail"));
    }
}
