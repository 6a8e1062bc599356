//! Two-stage "luck" proof-of-work consensus engine.
//!
//! Sealing a block takes two coupled nonce searches: the first nonce must
//! drive a memory-hard hash under the retargeted `alpha`, and the luck
//! value it fixes sets the second-stage target `beta` the second nonce must
//! clear. Both targets re-derive from the parent every block, so the whole
//! seal is checkable from the header alone plus its parent.
//!
//! The engine owns no chain state. It reads the chain through the
//! [`ChainReader`] seam, credits rewards through [`State`], and reports
//! mined blocks over channels; its only mutable state is the lazily seeded
//! nonce source shared by concurrent seal calls.

pub mod difficulty;
pub mod error;
pub mod pow;
pub mod reward;
mod sealer;
mod validation;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

use alloy_primitives::{Address, B256, U256};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use luck_primitives::{
    Block, ChainReader, Header, Receipt, State, Transaction, EMPTY_UNCLE_HASH,
};

pub use error::ConsensusError;
pub use reward::{block_reward, BLOCK_REWARD, HALVING_PERIOD};

/// Marker for an RPC namespace an engine exposes to the host's RPC stack.
/// The luck engine exposes none, so [`LuckPow::apis`] always returns the
/// empty list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineApi;

/// The luck proof-of-work engine.
pub struct LuckPow {
    /// Nonce source for the sealer, seeded from the OS on first use.
    pub(crate) rand: Mutex<Option<StdRng>>,
}

impl LuckPow {
    /// Create an engine instance.
    pub fn new() -> Self {
        Self {
            rand: Mutex::new(None),
        }
    }

    /// The address receiving the block reward.
    pub fn author(&self, header: &Header) -> Address {
        header.coinbase
    }

    /// Advisory difficulty for the host's fork-choice plumbing. The real
    /// retarget is internal to [`prepare`](Self::prepare) and verification;
    /// this stays a constant for interface compatibility.
    pub fn calc_difficulty(&self, _chain: &dyn ChainReader, _time: u64, _parent: &Header) -> U256 {
        U256::from(1u64)
    }

    /// Verify a header against its parent, optionally including the seal.
    pub fn verify_header(
        &self,
        chain: &dyn ChainReader,
        header: &Header,
        seal: bool,
    ) -> Result<(), ConsensusError> {
        validation::verify_header(chain, header, seal)
    }

    /// Verify an ordered batch of headers concurrently.
    ///
    /// Outcomes arrive on the returned channel strictly in input order, one
    /// per header. Raising the abort flag stops further dispatch.
    pub fn verify_headers(
        &self,
        chain: Arc<dyn ChainReader>,
        headers: Vec<Header>,
        seals: Vec<bool>,
    ) -> (Arc<AtomicBool>, mpsc::Receiver<Result<(), ConsensusError>>) {
        validation::verify_headers(chain, headers, seals)
    }

    /// Validate the uncles of `block` against the recent ancestor window.
    pub fn verify_uncles(
        &self,
        chain: &dyn ChainReader,
        block: &Block,
    ) -> Result<(), ConsensusError> {
        validation::verify_uncles(chain, block)
    }

    /// Run only the proof-of-work checks of a header.
    pub fn verify_seal(
        &self,
        _chain: &dyn ChainReader,
        header: &Header,
    ) -> Result<(), ConsensusError> {
        validation::verify_seal(header)
    }

    /// Populate the header's `(basis, alpha)` from its parent, ahead of
    /// sealing.
    pub fn prepare(
        &self,
        chain: &dyn ChainReader,
        header: &mut Header,
    ) -> Result<(), ConsensusError> {
        let parent = chain
            .get_header(header.parent_hash, header.number.wrapping_sub(1))
            .ok_or(ConsensusError::UnknownAncestor)?;
        let (basis, alpha) = difficulty::calc_params(header.number, header.time, &parent);
        header.basis = basis;
        header.difficulty_alpha = alpha;
        Ok(())
    }

    /// Apply block rewards and write the post-state root into the header.
    pub fn finalize(
        &self,
        chain: &dyn ChainReader,
        header: &mut Header,
        state: &mut dyn State,
        _txs: &[Transaction],
        uncles: &[Header],
    ) {
        reward::accumulate_rewards(state, header, uncles);
        header.root = state.intermediate_root(chain.config().is_eip158(header.number));
    }

    /// Finalize and assemble the block to be sealed. Uncles are not carried
    /// into the sealed block; the uncle hash commits to the empty list.
    pub fn finalize_and_assemble(
        &self,
        chain: &dyn ChainReader,
        header: &mut Header,
        state: &mut dyn State,
        txs: &[Transaction],
        uncles: &[Header],
        _receipts: &[Receipt],
    ) -> Block {
        reward::accumulate_rewards(state, header, uncles);
        header.root = state.intermediate_root(chain.config().is_eip158(header.number));
        header.uncle_hash = EMPTY_UNCLE_HASH;
        Block::new(header.clone(), txs.to_vec(), Vec::new())
    }

    /// Start the two-phase nonce search for `block`.
    ///
    /// The sealed block is reported on `results` without blocking; raising
    /// `stop` aborts the search within one hash attempt. Returns the search
    /// thread's handle.
    pub fn seal(
        &self,
        _chain: &dyn ChainReader,
        block: Block,
        results: mpsc::Sender<Block>,
        stop: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, ConsensusError> {
        sealer::seal(self, block, results, stop)
    }

    /// Keccak-256 of the pre-seal header fields.
    pub fn seal_hash(&self, header: &Header) -> B256 {
        pow::seal_hash(header)
    }

    /// RPC namespaces exposed by this engine: none.
    pub fn apis(&self, _chain: &dyn ChainReader) -> Vec<EngineApi> {
        Vec::new()
    }

    /// Release engine resources. The luck engine holds none.
    pub fn close(&self) -> Result<(), ConsensusError> {
        Ok(())
    }
}

impl Default for LuckPow {
    fn default() -> Self {
        Self::new()
    }
}
