//! # Network Registry
//!
//! The signer has no network connection. What it calls "networks" are chain
//! parameter sets (address prefix, decimals, genesis hash or chain id) used to
//! validate and render scanned payloads.
//!
//! ```text
//! params.rs: NetworkParams, NetworkSpec (add-network payload)
//! registry.rs: NetworkRegistry and the built-in networks
//! ```

pub mod params;
pub mod registry;

pub use params::{
    is_genesis_hash, EthereumNetwork, NetworkParams, NetworkProtocol, NetworkSpec,
    SubstrateNetwork,
};
pub use registry::NetworkRegistry;
