//! The mutable state handle the engine uses to apply rewards.

use alloy_primitives::{Address, B256, U256};

/// Minimal state surface consumed during finalization.
pub trait State {
    /// Credit `amount` to `addr`.
    fn add_balance(&mut self, addr: Address, amount: U256);

    /// Compute the current state root, optionally deleting empty accounts
    /// (EIP-158 semantics).
    fn intermediate_root(&mut self, delete_empty_objects: bool) -> B256;
}
