//! Read-only map of known networks.
//!
//! The decoder and classifier only ever read from a [`NetworkRegistry`].
//! Adding a network is the job of whoever owns the registry, in response to
//! an [`Intent::AddNetwork`](crate::scanner::Intent::AddNetwork).

use std::collections::BTreeMap;

use tracing::info;

use super::params::{EthereumNetwork, NetworkParams, NetworkProtocol, NetworkSpec, SubstrateNetwork};

pub const EDGEWARE_GENESIS: &str =
    "0x742a2ca70c2fda6cee4f8df98d64c4c670a052d9568058982dad9d5a7a135c5b";
pub const BERESHEET_GENESIS: &str =
    "0x67640d4c0087ed6b8d3d7654b7df557a0d14e470ce7b0ec0c0ba0e4d0ce2f5e8";
pub const KUSAMA_GENESIS: &str =
    "0xb0a8d493285c2df73290dfb7e61f870f17b41801197a149ca93654499ea3dafe";

pub const ETHEREUM_MAINNET_CHAIN_ID: u64 = 1;
pub const ETHEREUM_GOERLI_CHAIN_ID: u64 = 5;

/// Known networks keyed by network key.
#[derive(Clone, Debug, Default)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, NetworkParams>,
}

impl NetworkRegistry {
    /// An empty registry. Mostly useful in tests.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The networks every install ships with.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for params in default_networks() {
            registry.insert(params);
        }
        registry
    }

    /// Insert or replace a network.
    pub fn insert(&mut self, params: NetworkParams) {
        self.networks.insert(params.network_key(), params);
    }

    /// Register a network scanned from an add-network QR code.
    ///
    /// Returns the key it was stored under. An existing entry with the same
    /// genesis hash is replaced.
    pub fn add_network(&mut self, spec: NetworkSpec) -> String {
        let params = spec.into_params();
        let key = params.network_key();
        info!(network = %key, title = params.title(), "network added");
        self.insert(params);
        key
    }

    pub fn get(&self, network_key: &str) -> Option<&NetworkParams> {
        self.networks.get(network_key)
    }

    pub fn contains(&self, network_key: &str) -> bool {
        self.networks.contains_key(network_key)
    }

    /// Substrate network by genesis hash, case-insensitive.
    pub fn substrate(&self, genesis_hash: &str) -> Option<&SubstrateNetwork> {
        self.networks
            .get(&genesis_hash.to_lowercase())
            .and_then(NetworkParams::as_substrate)
    }

    /// Ethereum network by chain id.
    pub fn ethereum(&self, chain_id: u64) -> Option<&EthereumNetwork> {
        match self.networks.get(&chain_id.to_string()) {
            Some(NetworkParams::Ethereum(n)) => Some(n),
            _ => None,
        }
    }

    /// Keys of every network of the given protocol, in key order.
    pub fn keys_for(&self, protocol: NetworkProtocol) -> Vec<String> {
        self.networks
            .iter()
            .filter(|(_, params)| params.protocol() == protocol)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkParams> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

fn default_networks() -> Vec<NetworkParams> {
    vec![
        NetworkParams::Substrate(SubstrateNetwork {
            genesis_hash: EDGEWARE_GENESIS.into(),
            title: "Edgeware".into(),
            prefix: 7,
            decimals: 18,
            unit: "EDG".into(),
            path_id: "edgeware".into(),
            is_testnet: false,
        }),
        NetworkParams::Substrate(SubstrateNetwork {
            genesis_hash: BERESHEET_GENESIS.into(),
            title: "Beresheet".into(),
            prefix: 7,
            decimals: 18,
            unit: "tEDG".into(),
            path_id: "edgeware".into(),
            is_testnet: true,
        }),
        NetworkParams::Substrate(SubstrateNetwork {
            genesis_hash: KUSAMA_GENESIS.into(),
            title: "Kusama".into(),
            prefix: 2,
            decimals: 12,
            unit: "KSM".into(),
            path_id: "kusama".into(),
            is_testnet: false,
        }),
        NetworkParams::Ethereum(EthereumNetwork {
            chain_id: ETHEREUM_MAINNET_CHAIN_ID,
            title: "Ethereum".into(),
            is_testnet: false,
        }),
        NetworkParams::Ethereum(EthereumNetwork {
            chain_id: ETHEREUM_GOERLI_CHAIN_ID,
            title: "Görli Testnet".into(),
            is_testnet: true,
        }),
    ]
}
