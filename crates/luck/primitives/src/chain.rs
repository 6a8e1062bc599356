//! Chain configuration and the read-only chain view the engine consumes.

use alloy_primitives::B256;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{Block, Header};

/// Luck mainnet chain ID.
pub const LUCK_MAINNET_CHAIN_ID: u64 = 8898;

/// Luck testnet chain ID.
pub const LUCK_TESTNET_CHAIN_ID: u64 = 8899;

/// Fork schedule slice the consensus engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain ID.
    pub chain_id: u64,
    /// Height at which empty-account deletion (EIP-158) activates.
    pub eip158_block: Option<u64>,
}

impl ChainConfig {
    /// Whether EIP-158 state clearing is active at `number`.
    pub fn is_eip158(&self, number: u64) -> bool {
        self.eip158_block.is_some_and(|block| number >= block)
    }

    /// Look up a built-in chain configuration by chain ID.
    pub fn from_chain_id(chain_id: u64) -> Option<&'static ChainConfig> {
        match chain_id {
            LUCK_MAINNET_CHAIN_ID => Some(&LUCK_MAINNET),
            LUCK_TESTNET_CHAIN_ID => Some(&LUCK_TESTNET),
            _ => None,
        }
    }
}

/// Luck mainnet configuration.
pub static LUCK_MAINNET: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: LUCK_MAINNET_CHAIN_ID,
    eip158_block: Some(0),
});

/// Luck testnet configuration.
pub static LUCK_TESTNET: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: LUCK_TESTNET_CHAIN_ID,
    eip158_block: Some(0),
});

/// Read-only view of the canonical chain.
///
/// Lookups are keyed by both hash and height so a reorg-aware host can answer
/// from its canonical index without ambiguity.
pub trait ChainReader: Send + Sync {
    /// Header with the given hash at the given height, if known.
    fn get_header(&self, hash: B256, number: u64) -> Option<Header>;

    /// Full block with the given hash at the given height, if known.
    fn get_block(&self, hash: B256, number: u64) -> Option<Block>;

    /// The chain configuration in force.
    fn config(&self) -> &ChainConfig;
}
