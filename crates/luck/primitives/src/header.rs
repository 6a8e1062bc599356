//! Block header with the two-stage PoW seal fields.

use alloy_primitives::{keccak256, Address, Bloom, Bytes, FixedBytes, B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// 64-bit seal nonce, stored big-endian so it RLP-encodes the same way the
/// integer it carries would.
pub type BlockNonce = FixedBytes<8>;

/// Pack a nonce value into its 8-byte header representation.
pub fn encode_nonce(nonce: u64) -> BlockNonce {
    BlockNonce::from(nonce.to_be_bytes())
}

/// A Luck chain block header.
///
/// Beyond the usual ethereum-style fields, the seal consists of five coupled
/// parameters (`basis`, `lucky`, `difficulty_alpha`, `difficulty_beta`,
/// `difficulty`) and two nonces, one per search phase. The consensus engine
/// is the only component that writes them; everything else treats them as
/// opaque header payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Header {
    /// Hash of the parent header.
    pub parent_hash: B256,
    /// Hash of the uncle list.
    pub uncle_hash: B256,
    /// Reward destination.
    pub coinbase: Address,
    /// Post-state root.
    pub root: B256,
    /// Transactions trie root.
    pub tx_hash: B256,
    /// Receipts trie root.
    pub receipt_hash: B256,
    /// Log bloom filter.
    pub bloom: Bloom,
    /// Block height; parent height plus one.
    pub number: u64,
    /// Gas ceiling for the block.
    pub gas_limit: u64,
    /// Gas consumed by the block.
    pub gas_used: u64,
    /// Unix timestamp in seconds, strictly after the parent's.
    pub time: u64,
    /// Free-form extra data, bounded by consensus.
    pub extra: Bytes,
    /// Parent-derived scalar steering the second-stage target.
    pub basis: U256,
    /// Bounded luck value drawn from the first-stage nonce.
    pub lucky: U256,
    /// First-stage PoW target.
    pub difficulty_alpha: U256,
    /// Second-stage PoW target, derived from `lucky` and `basis`.
    pub difficulty_beta: U256,
    /// Advertised difficulty derived from the seal.
    pub difficulty: U256,
    /// Nonce satisfying the first-stage target.
    pub first_nonce: BlockNonce,
    /// Nonce satisfying the second-stage target.
    pub second_nonce: BlockNonce,
}

impl Header {
    /// Keccak-256 of the RLP-encoded header, including the seal fields.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}
