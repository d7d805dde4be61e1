//! In-memory wallets.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{AccountResolver, FoundAccount, SenderQuery, WalletSummary};
use crate::address::{
    ethereum_address, normalize_ethereum_address, ss58_encode, substrate_account_id, AddressError,
};
use crate::crypto::{KeyBackend, KeyError, SignatureScheme};
use crate::network::{NetworkParams, NetworkProtocol};
use crate::seed::EncryptedSeed;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("{scheme} keys cannot be used on {protocol:?} networks")]
    SchemeMismatch {
        scheme: SignatureScheme,
        protocol: NetworkProtocol,
    },
}

/// One derived account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub protocol: NetworkProtocol,
    pub address: String,
    pub network_key: String,
    pub path: String,
    pub scheme: SignatureScheme,
}

/// A wallet: one encrypted seed and the accounts derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub name: String,
    pub encrypted_seed: EncryptedSeed,
    #[serde(default)]
    pub accounts: Vec<AccountRecord>,
}

impl Wallet {
    pub fn summary(&self) -> WalletSummary {
        WalletSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            encrypted_seed_id: self.encrypted_seed.id.clone(),
        }
    }
}

/// Derive the account at `path` on `network`.
pub fn derive_account(
    backend: &dyn KeyBackend,
    seed: &[u8],
    path: &str,
    scheme: SignatureScheme,
    network: &NetworkParams,
) -> Result<AccountRecord, DeriveError> {
    let address = match (network, scheme) {
        (NetworkParams::Ethereum(_), SignatureScheme::Ethereum) => {
            ethereum_address(&backend.public_key(seed, path, scheme)?)?
        }
        (NetworkParams::Substrate(substrate), scheme) if scheme != SignatureScheme::Ethereum => {
            let public = backend.public_key(seed, path, scheme)?;
            ss58_encode(&substrate_account_id(scheme, &public), substrate.prefix)?
        }
        _ => {
            return Err(DeriveError::SchemeMismatch {
                scheme,
                protocol: network.protocol(),
            })
        }
    };

    Ok(AccountRecord {
        protocol: network.protocol(),
        address,
        network_key: network.network_key(),
        path: path.to_string(),
        scheme,
    })
}

fn address_matches(protocol: NetworkProtocol, stored: &str, queried: &str) -> bool {
    match protocol {
        NetworkProtocol::Substrate => stored == queried,
        NetworkProtocol::Ethereum => {
            normalize_ethereum_address(stored) == normalize_ethereum_address(queried)
        }
    }
}

/// Wallets held in memory.
#[derive(Debug, Default)]
pub struct WalletStore {
    wallets: RwLock<Vec<Wallet>>,
}

impl WalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_wallets(wallets: Vec<Wallet>) -> Self {
        Self {
            wallets: RwLock::new(wallets),
        }
    }

    /// Insert or replace a wallet by id.
    pub fn insert(&self, wallet: Wallet) {
        let mut wallets = self.wallets.write();
        wallets.retain(|w| w.id != wallet.id);
        wallets.push(wallet);
    }

    pub fn remove(&self, wallet_id: &str) -> Option<Wallet> {
        let mut wallets = self.wallets.write();
        let index = wallets.iter().position(|w| w.id == wallet_id)?;
        Some(wallets.remove(index))
    }

    pub fn wallets(&self) -> Vec<Wallet> {
        self.wallets.read().clone()
    }

    fn find_account(&self, query: &SenderQuery) -> Option<FoundAccount> {
        let wallets = self.wallets.read();
        wallets.iter().find_map(|wallet| {
            wallet
                .accounts
                .iter()
                .find(|account| {
                    account.protocol == query.protocol
                        && address_matches(query.protocol, &account.address, &query.address)
                        && query
                            .network_key
                            .as_ref()
                            .map_or(true, |key| key.eq_ignore_ascii_case(&account.network_key))
                })
                .map(|account| FoundAccount {
                    address: account.address.clone(),
                    encrypted_seed_id: wallet.encrypted_seed.id.clone(),
                    path: account.path.clone(),
                    network_key: account.network_key.clone(),
                })
        })
    }
}

#[async_trait]
impl AccountResolver for WalletStore {
    async fn resolve_sender(&self, query: &SenderQuery) -> Option<FoundAccount> {
        let found = self.find_account(query);
        debug!(found = found.is_some(), protocol = ?query.protocol, "sender lookup");
        found
    }

    async fn wallet_for_seed(&self, encrypted_seed_id: &str) -> Option<WalletSummary> {
        self.wallets
            .read()
            .iter()
            .find(|w| w.encrypted_seed.id == encrypted_seed_id)
            .map(Wallet::summary)
    }
}
