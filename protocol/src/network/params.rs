//! Chain parameters for the networks the signer knows about.

use serde::{Deserialize, Serialize};

/// Parameters of a Substrate-based chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateNetwork {
    /// `0x`-prefixed lowercase genesis hash. Also the network key.
    pub genesis_hash: String,
    pub title: String,
    /// SS58 address prefix.
    pub prefix: u16,
    pub decimals: u8,
    /// Display unit, e.g. `KSM`.
    pub unit: String,
    /// Derivation path segment accounts on this chain live under.
    pub path_id: String,
    pub is_testnet: bool,
}

/// Parameters of an EVM chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumNetwork {
    /// EIP-155 chain id. Its decimal rendering is the network key.
    pub chain_id: u64,
    pub title: String,
    pub is_testnet: bool,
}

/// Which family of chain a network belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProtocol {
    Substrate,
    Ethereum,
}

/// A known network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum NetworkParams {
    Substrate(SubstrateNetwork),
    Ethereum(EthereumNetwork),
}

impl NetworkParams {
    /// Registry key: genesis hash for Substrate, decimal chain id for Ethereum.
    pub fn network_key(&self) -> String {
        match self {
            NetworkParams::Substrate(n) => n.genesis_hash.clone(),
            NetworkParams::Ethereum(n) => n.chain_id.to_string(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            NetworkParams::Substrate(n) => &n.title,
            NetworkParams::Ethereum(n) => &n.title,
        }
    }

    pub fn protocol(&self) -> NetworkProtocol {
        match self {
            NetworkParams::Substrate(_) => NetworkProtocol::Substrate,
            NetworkParams::Ethereum(_) => NetworkProtocol::Ethereum,
        }
    }

    pub fn is_ethereum(&self) -> bool {
        matches!(self, NetworkParams::Ethereum(_))
    }

    pub fn as_substrate(&self) -> Option<&SubstrateNetwork> {
        match self {
            NetworkParams::Substrate(n) => Some(n),
            NetworkParams::Ethereum(_) => None,
        }
    }
}

/// The JSON body of an "add network" QR code.
///
/// Only the fields a signer needs are required; display extras are optional
/// and ignored beyond `pathId`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    pub genesis_hash: String,
    pub title: String,
    pub prefix: u16,
    pub decimals: u8,
    pub unit: String,
    #[serde(default)]
    pub path_id: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl NetworkSpec {
    /// Convert into registry parameters. The genesis hash is lowercased so the
    /// key matches what the classifier derives from payload bytes.
    pub fn into_params(self) -> NetworkParams {
        let path_id = self
            .path_id
            .unwrap_or_else(|| self.title.to_lowercase().replace(' ', "_"));
        NetworkParams::Substrate(SubstrateNetwork {
            genesis_hash: self.genesis_hash.to_lowercase(),
            title: self.title,
            prefix: self.prefix,
            decimals: self.decimals,
            unit: self.unit,
            path_id,
            is_testnet: false,
        })
    }
}

/// `true` if `value` looks like a genesis hash: `0x` followed by 64 hex digits.
pub fn is_genesis_hash(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hash_shape() {
        assert!(is_genesis_hash(
            "0xb0a8d493285c2df73290dfb7e61f870f17b41801197a149ca93654499ea3dafe"
        ));
        assert!(!is_genesis_hash("0xb0a8"));
        assert!(!is_genesis_hash(
            "b0a8d493285c2df73290dfb7e61f870f17b41801197a149ca93654499ea3dafe"
        ));
        assert!(!is_genesis_hash(
            "0xzza8d493285c2df73290dfb7e61f870f17b41801197a149ca93654499ea3dafe"
        ));
    }

    #[test]
    fn network_spec_parses_camel_case_json() {
        let json = r#"{
            "genesisHash": "0xAB00000000000000000000000000000000000000000000000000000000000001",
            "title": "Test Chain",
            "prefix": 42,
            "decimals": 10,
            "unit": "TST"
        }"#;
        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        let params = spec.into_params();
        assert_eq!(
            params.network_key(),
            "0xab00000000000000000000000000000000000000000000000000000000000001"
        );
        assert_eq!(params.as_substrate().unwrap().path_id, "test_chain");
    }

    #[test]
    fn ethereum_key_is_decimal_chain_id() {
        let params = NetworkParams::Ethereum(EthereumNetwork {
            chain_id: 5,
            title: "Goerli".into(),
            is_testnet: true,
        });
        assert_eq!(params.network_key(), "5");
        assert!(params.is_ethereum());
        assert!(params.as_substrate().is_none());
    }
}
