//! Static route table for the supported CCTP testnet chains.
//!
//! Each [`ChainRoute`] carries everything the orchestrator needs to talk to
//! one chain: the EVM chain id, the CCTP domain id (a distinct logical
//! identifier assigned by Circle), the USDC token and CCTP contract
//! addresses, and default RPC/explorer endpoints. The table is immutable at
//! runtime; RPC URLs can be overridden through configuration.

use alloy::primitives::{Address, FixedBytes, address};
use thiserror::Error;

/// Configuration for a single supported chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRoute {
    /// EVM chain id (as reported by `eth_chainId`).
    pub chain_id: u64,
    /// CCTP domain id. Not the same namespace as the chain id.
    pub domain_id: u32,
    pub name: &'static str,
    pub short_name: &'static str,
    /// USDC token contract.
    pub usdc: Address,
    /// TokenMessenger contract (burn side).
    pub token_messenger: Address,
    /// MessageTransmitter contract (mint side).
    pub message_transmitter: Address,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
}

pub const ETHEREUM_SEPOLIA: ChainRoute = ChainRoute {
    chain_id: 11_155_111,
    domain_id: 0,
    name: "Ethereum Sepolia",
    short_name: "Sepolia",
    usdc: address!("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
    token_messenger: address!("0x8FE6B999Dc680CcFDD5Bf7EB0974218be2542DAA"),
    message_transmitter: address!("0xE737e5cEBEEBa77EFE34D4aa090756590b1CE275"),
    rpc_url: "https://sepolia.infura.io/v3/",
    explorer_url: "https://sepolia.etherscan.io",
};

pub const BSC_TESTNET: ChainRoute = ChainRoute {
    chain_id: 97,
    domain_id: 4,
    name: "BNB Smart Chain Testnet",
    short_name: "BSC Testnet",
    usdc: address!("0x9999f7Fea5938fD3b1E26A12c3f2fb024e194f97"),
    token_messenger: address!("0x9f3B8679c73C2Fef8b59B4f3444d4e156fb70AA5"),
    message_transmitter: address!("0x7865fAfC2db2093669d92c0F33AeEF291086BEFD"),
    rpc_url: "https://data-seed-prebsc-1-s1.binance.org:8545/",
    explorer_url: "https://testnet.bscscan.com",
};

pub const POLYGON_AMOY: ChainRoute = ChainRoute {
    chain_id: 80_002,
    domain_id: 7,
    name: "Polygon Amoy",
    short_name: "Amoy",
    usdc: address!("0x41e94eb019c0762f9bfcf9fb1e58725bfb0e7582"),
    token_messenger: address!("0x9f3B8679c73C2Fef8b59B4f3444d4e156fb70AA5"),
    message_transmitter: address!("0x7865fAfC2db2093669d92c0F33AeEF291086BEFD"),
    rpc_url: "https://rpc-amoy.polygon.technology/",
    explorer_url: "https://amoy.polygonscan.com",
};

pub const ARBITRUM_SEPOLIA: ChainRoute = ChainRoute {
    chain_id: 421_614,
    domain_id: 3,
    name: "Arbitrum Sepolia",
    short_name: "Arb Sepolia",
    usdc: address!("0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d"),
    token_messenger: address!("0x9f3B8679c73C2Fef8b59B4f3444d4e156fb70AA5"),
    message_transmitter: address!("0xaCF1ceeF35caAc005e15888dDb8A3515C41B4872"),
    rpc_url: "https://sepolia-rollup.arbitrum.io/rpc",
    explorer_url: "https://sepolia.arbiscan.io",
};

pub const ARC_TESTNET: ChainRoute = ChainRoute {
    chain_id: 5_042_002,
    domain_id: 26,
    name: "ARC Testnet",
    short_name: "ARC",
    usdc: address!("0x3600000000000000000000000000000000000000"),
    token_messenger: address!("0x8FE6B999Dc680CcFDD5Bf7EB0974218be2542DAA"),
    message_transmitter: address!("0xE737e5cEBEEBa77EFE34D4aa090756590b1CE275"),
    rpc_url: "https://rpc.testnet.arc.network",
    explorer_url: "https://testnet.arcscan.app",
};

/// All chains the orchestrator knows how to bridge between.
pub static SUPPORTED_ROUTES: [ChainRoute; 5] = [
    ETHEREUM_SEPOLIA,
    BSC_TESTNET,
    POLYGON_AMOY,
    ARBITRUM_SEPOLIA,
    ARC_TESTNET,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Chain {chain_id} is not a supported bridge route")]
    Unsupported { chain_id: u64 },
    #[error("Cannot bridge to the same chain ({chain_id})")]
    SameChain { chain_id: u64 },
}

/// Looks up the route for a chain id.
pub fn route(chain_id: u64) -> Option<&'static ChainRoute> {
    SUPPORTED_ROUTES.iter().find(|r| r.chain_id == chain_id)
}

/// Validates a source/destination pair, returning both routes.
///
/// Rejects same-chain pairs and chains absent from the table.
pub fn validate_pair(
    source_chain_id: u64,
    destination_chain_id: u64,
) -> Result<(&'static ChainRoute, &'static ChainRoute), RouteError> {
    if source_chain_id == destination_chain_id {
        return Err(RouteError::SameChain {
            chain_id: source_chain_id,
        });
    }

    let source = route(source_chain_id).ok_or(RouteError::Unsupported {
        chain_id: source_chain_id,
    })?;
    let destination = route(destination_chain_id).ok_or(RouteError::Unsupported {
        chain_id: destination_chain_id,
    })?;

    Ok((source, destination))
}

/// Left-pads an address to the 32-byte form CCTP uses for mint recipients.
pub fn address_to_bytes32(address: Address) -> FixedBytes<32> {
    FixedBytes::<32>::left_padding_from(address.as_slice())
}

/// Recovers an address from its 32-byte padded form (last 20 bytes).
pub fn bytes32_to_address(bytes: FixedBytes<32>) -> Address {
    Address::from_slice(&bytes[12..])
}
