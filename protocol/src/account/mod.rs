//! # Account Resolution
//!
//! Wallet and account management live outside this crate. The signing
//! pipeline only needs to answer two questions, both through
//! [`AccountResolver`]:
//!
//! 1. Which account, derived from which seed at which path, sent this request?
//! 2. Does a wallet still hold that seed?
//!
//! [`WalletStore`] is an in-memory implementation used by the CLI and tests.

pub mod store;

pub use store::{derive_account, AccountRecord, DeriveError, Wallet, WalletStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::NetworkProtocol;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no wallet holds account {0}")]
    NoMatchingWallet(String),
}

/// Who a scanned request claims to be from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderQuery {
    pub protocol: NetworkProtocol,
    /// SS58 for Substrate, lowercase hex without `0x` for Ethereum.
    pub address: String,
    /// `None` when the request does not name a network (Ethereum hashes and
    /// messages). Resolvers then search every network of `protocol`.
    pub network_key: Option<String>,
}

/// An account a resolver found for a [`SenderQuery`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundAccount {
    pub address: String,
    pub encrypted_seed_id: String,
    pub path: String,
    pub network_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub id: String,
    pub name: String,
    pub encrypted_seed_id: String,
}

/// Read-only lookups into wherever accounts are persisted.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    async fn resolve_sender(&self, query: &SenderQuery) -> Option<FoundAccount>;

    async fn wallet_for_seed(&self, encrypted_seed_id: &str) -> Option<WalletSummary>;
}
