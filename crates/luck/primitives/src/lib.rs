//! Core types shared between the Luck consensus engine and its host.
//!
//! This crate provides:
//! - The block header carrying the two-stage PoW parameters
//! - Blocks with opaque transaction payloads
//! - The narrow `ChainReader` / `State` seams the engine consumes
//! - Chain configuration and protocol constants

pub mod block;
pub mod chain;
pub mod header;
pub mod state;

pub use block::{Block, Receipt, Transaction, EMPTY_UNCLE_HASH};
pub use chain::{ChainConfig, ChainReader, LUCK_MAINNET, LUCK_TESTNET};
pub use header::{encode_nonce, BlockNonce, Header};
pub use state::State;

/// Protocol constants the engine validates against.
pub mod params {
    use alloy_primitives::{address, Address};

    /// Divisor bounding per-block gas limit movement relative to the parent.
    pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

    /// Minimum gas limit any header may carry.
    pub const MIN_GAS_LIMIT: u64 = 5000;

    /// Maximum size of the header extra-data field in bytes.
    pub const MAXIMUM_EXTRA_DATA_SIZE: usize = 32;

    /// Protocol author fund credited 5% of every block reward.
    pub const AUTHOR_REWARD_ADDR: Address =
        address!("0000000000000000000000000000000000000001");
}
