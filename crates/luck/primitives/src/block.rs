//! Blocks: a sealed header plus body payloads the engine never interprets.

use alloy_primitives::{b256, Bytes, B256};

use crate::header::Header;

/// Opaque RLP transaction payload. Execution is the host's concern.
pub type Transaction = Bytes;

/// Opaque RLP receipt payload.
pub type Receipt = Bytes;

/// Keccak-256 of the RLP empty list; the uncle hash of a block sealing no
/// uncles.
pub const EMPTY_UNCLE_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// A full block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// Uncle headers referenced by this block.
    pub uncles: Vec<Header>,
    /// Transaction payloads.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block from its parts.
    pub fn new(header: Header, transactions: Vec<Transaction>, uncles: Vec<Header>) -> Self {
        Self {
            header,
            uncles,
            transactions,
        }
    }

    /// Block height.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Hash of the parent header.
    pub fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }

    /// Hash of this block's header.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Replace the header with a sealed copy, keeping the body.
    pub fn with_seal(&self, header: Header) -> Self {
        Self {
            header,
            uncles: self.uncles.clone(),
            transactions: self.transactions.clone(),
        }
    }
}
