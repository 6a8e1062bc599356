//! Consensus error taxonomy.
//!
//! Each validation routine returns the first failure it finds; all variants
//! are fatal for the offending header but never for the process.

use thiserror::Error;

/// Errors produced while verifying headers, uncles, or seals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// Parent header is not present in the chain.
    #[error("unknown ancestor")]
    UnknownAncestor,

    /// Timestamp is further ahead of wall time than the allowed drift.
    #[error("block in the future")]
    FutureBlock,

    /// Timestamp is not strictly after the parent's.
    #[error("timestamp older than parent")]
    OlderBlockTime,

    /// Block number is not parent number plus one.
    #[error("invalid block number")]
    InvalidNumber,

    /// A seal parameter does not match its recomputation from the parent.
    #[error("param inconsistence")]
    Inconsistence,

    /// The luck value does not match its recomputation from the first nonce.
    #[error("compute the luck")]
    ComputeLucky,

    /// A proof-of-work check failed.
    #[error("mined block unknown")]
    UnknownBlock,

    /// More uncles than the consensus limit.
    #[error("too many uncles")]
    TooManyUncles,

    /// Uncle already included by this block or a recent ancestor.
    #[error("duplicate uncle")]
    DuplicateUncle,

    /// Uncle is itself an ancestor of the including block.
    #[error("uncle is ancestor")]
    UncleIsAncestor,

    /// Uncle's parent is not among the recent ancestors.
    #[error("uncle's parent is not ancestor")]
    DanglingUncle,

    /// Extra-data field exceeds the consensus bound.
    #[error("extra-data too long: {len} > {max}")]
    ExtraDataTooLong {
        /// Observed extra-data length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// Gas limit exceeds the 63-bit cap.
    #[error("invalid gasLimit: have {have}, max {max}")]
    GasLimitTooHigh {
        /// Observed gas limit.
        have: u64,
        /// Maximum allowed gas limit.
        max: u64,
    },

    /// Gas used exceeds the gas limit.
    #[error("invalid gasUsed: have {gas_used}, gasLimit {gas_limit}")]
    GasUsedExceedsLimit {
        /// Observed gas used.
        gas_used: u64,
        /// The header's gas limit.
        gas_limit: u64,
    },

    /// Gas limit moved too far from the parent's, or below the minimum.
    #[error("invalid gas limit: have {have}, want {parent} +- {limit}")]
    GasLimitOutOfBounds {
        /// Observed gas limit.
        have: u64,
        /// Parent's gas limit.
        parent: u64,
        /// Maximum allowed movement.
        limit: u64,
    },

    /// The sealer could not seed its nonce source.
    #[error("failed to seed sealer randomness: {0}")]
    SealerRng(String),
}
