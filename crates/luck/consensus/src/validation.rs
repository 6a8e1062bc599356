//! Header, seal, and uncle validation.
//!
//! Single-header checks run in the caller's thread. Batch verification
//! fans out over a pool of worker threads sized to the host CPU count and
//! re-emits outcomes strictly in input order through a buffered channel;
//! an abort flag stops further dispatch between tasks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::B256;
use tokio::sync::mpsc;
use tracing::debug;

use luck_primitives::{params, Block, ChainReader, Header};

use crate::difficulty;
use crate::error::ConsensusError;
use crate::pow;

/// Tolerated clock drift before a header is a future block.
const ALLOWED_FUTURE_SECS: u64 = 15;

/// Gas limit ceiling, 2^63 - 1.
const GAS_LIMIT_CAP: u64 = 0x7fff_ffff_ffff_ffff;

/// Maximum uncles per block.
const MAX_UNCLES: usize = 2;

/// Depth of the ancestor window uncles may attach to.
const UNCLE_WINDOW: u64 = 7;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Verify a single header against the chain, resolving its parent.
pub(crate) fn verify_header(
    chain: &dyn ChainReader,
    header: &Header,
    seal: bool,
) -> Result<(), ConsensusError> {
    let number = header.number;
    if chain.get_header(header.hash(), number).is_some() {
        return Ok(());
    }
    let parent = chain
        .get_header(header.parent_hash, number.wrapping_sub(1))
        .ok_or(ConsensusError::UnknownAncestor)?;
    verify_header_against_parent(header, &parent, false, seal)
}

/// The full rule set for one header whose parent is already resolved.
pub(crate) fn verify_header_against_parent(
    header: &Header,
    parent: &Header,
    uncle: bool,
    seal: bool,
) -> Result<(), ConsensusError> {
    if header.extra.len() > params::MAXIMUM_EXTRA_DATA_SIZE {
        return Err(ConsensusError::ExtraDataTooLong {
            len: header.extra.len(),
            max: params::MAXIMUM_EXTRA_DATA_SIZE,
        });
    }
    // Uncles were sealed in the past by construction; only fresh headers
    // are held against the wall clock.
    if !uncle && header.time > unix_now() + ALLOWED_FUTURE_SECS {
        return Err(ConsensusError::FutureBlock);
    }
    if header.time <= parent.time {
        return Err(ConsensusError::OlderBlockTime);
    }
    if header.gas_limit > GAS_LIMIT_CAP {
        return Err(ConsensusError::GasLimitTooHigh {
            have: header.gas_limit,
            max: GAS_LIMIT_CAP,
        });
    }
    if header.gas_used > header.gas_limit {
        return Err(ConsensusError::GasUsedExceedsLimit {
            gas_used: header.gas_used,
            gas_limit: header.gas_limit,
        });
    }
    let moved = parent.gas_limit.abs_diff(header.gas_limit);
    let limit = parent.gas_limit / params::GAS_LIMIT_BOUND_DIVISOR;
    if moved >= limit || header.gas_limit < params::MIN_GAS_LIMIT {
        return Err(ConsensusError::GasLimitOutOfBounds {
            have: header.gas_limit,
            parent: parent.gas_limit,
            limit,
        });
    }
    if header.number != parent.number.wrapping_add(1) {
        return Err(ConsensusError::InvalidNumber);
    }

    let (basis, alpha) = difficulty::calc_params(header.number, header.time, parent);
    if basis != header.basis {
        return Err(ConsensusError::Inconsistence);
    }
    if alpha != header.difficulty_alpha {
        return Err(ConsensusError::Inconsistence);
    }

    if seal {
        verify_seal(header)?;
    }
    Ok(())
}

/// The proof-of-work sub-checks: both seal stages, the luck recomputation,
/// and the derived targets.
pub(crate) fn verify_seal(header: &Header) -> Result<(), ConsensusError> {
    let first_nonce = u64::from_be_bytes(header.first_nonce.0);
    let luck_seal = pow::seal_luck(header, first_nonce);
    if luck_seal >= header.difficulty_alpha {
        return Err(ConsensusError::UnknownBlock);
    }

    // No luck draw can reach the bound; a crafted value at or above it
    // must be rejected before it enters the beta arithmetic.
    if header.lucky >= pow::MAX_LUCK {
        return Err(ConsensusError::Inconsistence);
    }

    let beta = difficulty::calc_beta(header.lucky, header.basis);
    if beta != header.difficulty_beta {
        return Err(ConsensusError::Inconsistence);
    }

    let lucky = pow::calc_luck(header, first_nonce);
    if lucky != header.lucky {
        return Err(ConsensusError::ComputeLucky);
    }

    let second_nonce = u64::from_be_bytes(header.second_nonce.0);
    let block_seal = pow::seal_block(header, second_nonce);
    if block_seal >= header.difficulty_beta {
        return Err(ConsensusError::UnknownBlock);
    }

    if difficulty::calc_difficulty(header) != header.difficulty {
        return Err(ConsensusError::UnknownBlock);
    }

    Ok(())
}

/// Verify an ordered batch of headers on a worker pool.
///
/// Returns an abort flag and a receiver yielding exactly one outcome per
/// input header, in input order. Setting the flag stops further dispatch;
/// in-flight tasks finish but no new ones start.
pub(crate) fn verify_headers(
    chain: Arc<dyn ChainReader>,
    headers: Vec<Header>,
    seals: Vec<bool>,
) -> (Arc<AtomicBool>, mpsc::Receiver<Result<(), ConsensusError>>) {
    let abort = Arc::new(AtomicBool::new(false));
    let len = headers.len();
    let (results_tx, results_rx) = mpsc::channel(len.max(1));
    if len == 0 {
        return (abort, results_rx);
    }

    let workers = len.min(num_cpus::get());
    let headers = Arc::new(headers);
    let seals = Arc::new(seals);
    let next = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = std_mpsc::channel::<(usize, Result<(), ConsensusError>)>();

    for id in 0..workers {
        let chain = Arc::clone(&chain);
        let headers = Arc::clone(&headers);
        let seals = Arc::clone(&seals);
        let next = Arc::clone(&next);
        let abort = Arc::clone(&abort);
        let done_tx = done_tx.clone();
        thread::Builder::new()
            .name(format!("luck-verify-{id}"))
            .spawn(move || loop {
                if abort.load(Ordering::Relaxed) {
                    break;
                }
                let index = next.fetch_add(1, Ordering::Relaxed);
                if index >= headers.len() {
                    break;
                }
                let outcome = verify_header_worker(chain.as_ref(), &headers, &seals, index);
                if done_tx.send((index, outcome)).is_err() {
                    break;
                }
            })
            .expect("spawn header verify worker");
    }
    drop(done_tx);

    thread::Builder::new()
        .name("luck-verify-order".into())
        .spawn(move || {
            // Reorder buffer: workers finish out of order, the host sees
            // outcomes in input order.
            let mut buffered: Vec<Option<Result<(), ConsensusError>>> = vec![None; len];
            let mut out = 0;
            while out < len {
                let Ok((index, outcome)) = done_rx.recv() else {
                    debug!(
                        target: "luck::verify",
                        emitted = out,
                        total = len,
                        "batch verification aborted"
                    );
                    break;
                };
                buffered[index] = Some(outcome);
                while out < len {
                    let Some(slot) = buffered[out].take() else {
                        break;
                    };
                    // Capacity covers the whole batch, so this only fails
                    // once the host has dropped the receiver.
                    if results_tx.try_send(slot).is_err() {
                        return;
                    }
                    out += 1;
                }
            }
        })
        .expect("spawn header verify collector");

    (abort, results_rx)
}

/// One batch slot: resolve the parent from the chain or the preceding slice
/// element, short-circuit known headers, then run the full rule set.
fn verify_header_worker(
    chain: &dyn ChainReader,
    headers: &[Header],
    seals: &[bool],
    index: usize,
) -> Result<(), ConsensusError> {
    let header = &headers[index];
    let parent = if index == 0 {
        chain.get_header(header.parent_hash, header.number.wrapping_sub(1))
    } else if headers[index - 1].hash() == header.parent_hash {
        Some(headers[index - 1].clone())
    } else {
        None
    };
    let Some(parent) = parent else {
        return Err(ConsensusError::UnknownAncestor);
    };
    if chain.get_header(header.hash(), header.number).is_some() {
        return Ok(());
    }
    verify_header_against_parent(header, &parent, false, seals[index])
}

/// Validate a block's uncles: bounded count, recent ancestry, no reuse.
pub(crate) fn verify_uncles(
    chain: &dyn ChainReader,
    block: &Block,
) -> Result<(), ConsensusError> {
    if block.uncles.len() > MAX_UNCLES {
        return Err(ConsensusError::TooManyUncles);
    }

    // Walk the ancestor window, collecting both the ancestors themselves
    // and every uncle they already included.
    let mut uncles: HashSet<B256> = HashSet::new();
    let mut ancestors: HashMap<B256, Header> = HashMap::new();

    let mut number = block.number().wrapping_sub(1);
    let mut parent = block.parent_hash();
    for _ in 0..UNCLE_WINDOW {
        let Some(ancestor) = chain.get_block(parent, number) else {
            break;
        };
        for uncle in &ancestor.uncles {
            uncles.insert(uncle.hash());
        }
        parent = ancestor.parent_hash();
        number = number.wrapping_sub(1);
        ancestors.insert(ancestor.hash(), ancestor.header);
    }
    ancestors.insert(block.hash(), block.header.clone());
    uncles.insert(block.hash());

    for uncle in &block.uncles {
        let hash = uncle.hash();
        if uncles.contains(&hash) {
            return Err(ConsensusError::DuplicateUncle);
        }
        uncles.insert(hash);

        if ancestors.contains_key(&hash) {
            return Err(ConsensusError::UncleIsAncestor);
        }
        let Some(uncle_parent) = ancestors.get(&uncle.parent_hash) else {
            return Err(ConsensusError::DanglingUncle);
        };
        if uncle.parent_hash == block.parent_hash() {
            return Err(ConsensusError::DanglingUncle);
        }
        verify_header_against_parent(uncle, uncle_parent, true, true)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{child_of, genesis, sealed_child_of, MockChain};
    use alloy_primitives::{Bytes, U256};
    use luck_primitives::encode_nonce;

    #[test]
    fn known_header_short_circuits() {
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        // Garbage seal fields; acceptance must come from the known-block
        // lookup alone.
        header.lucky = U256::from(1u64);
        header.first_nonce = encode_nonce(1);

        let chain = MockChain::new().with_header(genesis).with_header(header.clone());
        assert_eq!(verify_header(&chain, &header, true), Ok(()));
    }

    #[test]
    fn missing_parent_is_unknown_ancestor() {
        let chain = MockChain::new();
        let header = child_of(&genesis(), 20);
        assert_eq!(
            verify_header(&chain, &header, false),
            Err(ConsensusError::UnknownAncestor)
        );
    }

    #[test]
    fn future_block_rejected() {
        let now = unix_now();
        let genesis = genesis_at(now);
        let mut header = child_of(&genesis, 0);
        header.time = now + 20;

        let chain = MockChain::new().with_header(genesis);
        assert_eq!(
            verify_header(&chain, &header, false),
            Err(ConsensusError::FutureBlock)
        );
    }

    fn genesis_at(time: u64) -> Header {
        let mut g = genesis();
        g.time = time;
        g
    }

    #[test]
    fn older_block_time_rejected() {
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        header.time = genesis.time;

        let chain = MockChain::new().with_header(genesis);
        assert_eq!(
            verify_header(&chain, &header, false),
            Err(ConsensusError::OlderBlockTime)
        );
    }

    #[test]
    fn oversized_extra_data_rejected() {
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        header.extra = Bytes::from(vec![0u8; params::MAXIMUM_EXTRA_DATA_SIZE + 1]);

        let chain = MockChain::new().with_header(genesis);
        assert!(matches!(
            verify_header(&chain, &header, false),
            Err(ConsensusError::ExtraDataTooLong { .. })
        ));
    }

    #[test]
    fn gas_used_above_limit_rejected() {
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        header.gas_used = header.gas_limit + 1;

        let chain = MockChain::new().with_header(genesis);
        assert!(matches!(
            verify_header(&chain, &header, false),
            Err(ConsensusError::GasUsedExceedsLimit { .. })
        ));
    }

    #[test]
    fn gas_limit_step_out_of_bounds_rejected() {
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        header.gas_limit = genesis.gas_limit * 2;

        let chain = MockChain::new().with_header(genesis);
        assert!(matches!(
            verify_header(&chain, &header, false),
            Err(ConsensusError::GasLimitOutOfBounds { .. })
        ));
    }

    #[test]
    fn wrong_number_rejected() {
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        header.number += 1;

        assert_eq!(
            verify_header_against_parent(&header, &genesis, false, false),
            Err(ConsensusError::InvalidNumber)
        );
    }

    #[test]
    fn retarget_mismatch_is_inconsistence() {
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        header.basis = header.basis + U256::from(1u64);

        let chain = MockChain::new().with_header(genesis);
        assert_eq!(
            verify_header(&chain, &header, false),
            Err(ConsensusError::Inconsistence)
        );
    }

    #[test]
    fn oversized_luck_value_is_inconsistence() {
        // A crafted header carrying a luck value at or above the draw
        // bound is rejected outright, not fed to the beta arithmetic.
        let genesis = genesis();
        let mut header = child_of(&genesis, 20);
        header.difficulty_alpha = U256::MAX; // any first nonce clears stage one

        header.lucky = pow::MAX_LUCK;
        assert_eq!(verify_seal(&header), Err(ConsensusError::Inconsistence));

        header.lucky = pow::MAX_LUCK + U256::from(1u64);
        assert_eq!(verify_seal(&header), Err(ConsensusError::Inconsistence));
    }

    #[test]
    fn verification_is_idempotent() {
        let genesis = genesis();
        let header = child_of(&genesis, 20);
        let chain = MockChain::new().with_header(genesis);

        let first = verify_header(&chain, &header, false);
        let second = verify_header(&chain, &header, false);
        assert_eq!(first, Ok(()));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn batch_emits_results_in_order() {
        let genesis = genesis();
        let mut headers = Vec::new();
        let mut parent = genesis.clone();
        for _ in 0..8 {
            let child = child_of(&parent, 20);
            headers.push(child.clone());
            parent = child;
        }

        let chain = Arc::new(MockChain::new().with_header(genesis));
        let seals = vec![false; headers.len()];
        let (_abort, mut results) = verify_headers(chain, headers, seals);

        let mut outcomes = Vec::new();
        while let Some(outcome) = results.recv().await {
            outcomes.push(outcome);
        }
        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.is_ok()));
    }

    #[tokio::test]
    async fn batch_reports_failure_at_its_index() {
        let genesis = genesis();
        let good = child_of(&genesis, 20);
        let mut bad = child_of(&good, 20);
        bad.basis = bad.basis + U256::from(1u64);
        let after_bad = child_of(&bad, 20);

        let chain = Arc::new(MockChain::new().with_header(genesis));
        let headers = vec![good, bad, after_bad];
        let (_abort, mut results) = verify_headers(chain, headers, vec![false; 3]);

        assert_eq!(results.recv().await, Some(Ok(())));
        assert_eq!(results.recv().await, Some(Err(ConsensusError::Inconsistence)));
        assert_eq!(results.recv().await, Some(Ok(())));
        assert_eq!(results.recv().await, None);
    }

    #[tokio::test]
    async fn batch_detached_parent_is_unknown_ancestor() {
        let genesis = genesis();
        let first = child_of(&genesis, 20);
        let mut detached = child_of(&first, 20);
        detached.parent_hash = B256::repeat_byte(0x77);

        let chain = Arc::new(MockChain::new().with_header(genesis));
        let (_abort, mut results) = verify_headers(chain, vec![first, detached], vec![false; 2]);

        assert_eq!(results.recv().await, Some(Ok(())));
        assert_eq!(
            results.recv().await,
            Some(Err(ConsensusError::UnknownAncestor))
        );
    }

    #[tokio::test]
    async fn batch_empty_input_closes_immediately() {
        let chain = Arc::new(MockChain::new());
        let (_abort, mut results) = verify_headers(chain, Vec::new(), Vec::new());
        assert_eq!(results.recv().await, None);
    }

    #[tokio::test]
    async fn batch_abort_terminates_stream() {
        let genesis = genesis();
        let mut headers = Vec::new();
        let mut parent = genesis.clone();
        for _ in 0..64 {
            let child = child_of(&parent, 20);
            headers.push(child.clone());
            parent = child;
        }

        let chain = Arc::new(MockChain::new().with_header(genesis));
        let (abort, mut results) = verify_headers(chain, headers, vec![false; 64]);
        abort.store(true, Ordering::Relaxed);

        // The stream must still terminate, emitting at most one outcome per
        // input and never out of order.
        let mut count = 0;
        while let Some(outcome) = results.recv().await {
            assert_eq!(outcome, Ok(()));
            count += 1;
        }
        assert!(count <= 64);
    }

    #[test]
    fn too_many_uncles_rejected() {
        let genesis = genesis();
        let uncle = child_of(&genesis, 21);
        let mut block = Block::new(child_of(&genesis, 20), Vec::new(), Vec::new());
        block.uncles = vec![uncle.clone(), uncle.clone(), uncle];

        let chain = MockChain::new().with_block(Block::new(genesis, Vec::new(), Vec::new()));
        assert_eq!(
            verify_uncles(&chain, &block),
            Err(ConsensusError::TooManyUncles)
        );
    }

    #[test]
    fn duplicate_uncle_rejected() {
        // The parent block already included the uncle; including it again
        // must trip the seen set before any header verification runs.
        let genesis = genesis();
        let parent_header = child_of(&genesis, 20);
        let mut uncle = child_of(&genesis, 21);
        uncle.coinbase = alloy_primitives::Address::repeat_byte(0x99);

        let parent_block =
            Block::new(parent_header.clone(), Vec::new(), vec![uncle.clone()]);
        let mut block = Block::new(child_of(&parent_header, 20), Vec::new(), Vec::new());
        block.uncles = vec![uncle];

        let chain = MockChain::new()
            .with_block(Block::new(genesis, Vec::new(), Vec::new()))
            .with_block(parent_block);
        assert_eq!(
            verify_uncles(&chain, &block),
            Err(ConsensusError::DuplicateUncle)
        );
    }

    #[test]
    fn ancestor_as_uncle_rejected() {
        let genesis = genesis();
        let parent = child_of(&genesis, 20);
        let mut header = child_of(&parent, 20);
        header.uncle_hash = B256::repeat_byte(0x01);
        let mut block = Block::new(header, Vec::new(), Vec::new());
        block.uncles = vec![parent.clone()];

        let chain = MockChain::new()
            .with_block(Block::new(genesis, Vec::new(), Vec::new()))
            .with_block(Block::new(parent, Vec::new(), Vec::new()));
        assert_eq!(
            verify_uncles(&chain, &block),
            Err(ConsensusError::UncleIsAncestor)
        );
    }

    #[test]
    fn sibling_uncle_is_dangling() {
        // An uncle sharing the block's own parent is a sibling, not an
        // uncle; the window starts at the grandparent.
        let genesis = genesis();
        let parent = child_of(&genesis, 20);
        let mut sibling = child_of(&parent, 21);
        sibling.coinbase = alloy_primitives::Address::repeat_byte(0x99);
        let mut block = Block::new(child_of(&parent, 20), Vec::new(), Vec::new());
        block.uncles = vec![sibling];

        let chain = MockChain::new()
            .with_block(Block::new(genesis, Vec::new(), Vec::new()))
            .with_block(Block::new(parent, Vec::new(), Vec::new()));
        assert_eq!(
            verify_uncles(&chain, &block),
            Err(ConsensusError::DanglingUncle)
        );
    }

    #[test]
    fn unknown_uncle_parent_is_dangling() {
        let (chain, block, mut uncle) = uncle_fixture();
        uncle.parent_hash = B256::repeat_byte(0x55);
        let mut block = block;
        block.uncles = vec![uncle];
        assert_eq!(
            verify_uncles(&chain, &block),
            Err(ConsensusError::DanglingUncle)
        );
    }

    #[test]
    fn valid_uncle_accepted() {
        let genesis = genesis();
        let parent = child_of(&genesis, 20);
        let block_header = child_of(&parent, 20);

        // A sealed competitor of `parent`, attached to the grandparent.
        let uncle = sealed_child_of(&genesis, 21, alloy_primitives::Address::repeat_byte(0x99));

        let mut block = Block::new(block_header, Vec::new(), Vec::new());
        block.uncles = vec![uncle];

        let chain = MockChain::new()
            .with_block(Block::new(genesis, Vec::new(), Vec::new()))
            .with_block(Block::new(parent, Vec::new(), Vec::new()));
        assert_eq!(verify_uncles(&chain, &block), Ok(()));
    }

    /// Grandparent + parent on-chain, block at height 2, one unsealed uncle
    /// attached to the grandparent. For error paths hit before seal checks.
    fn uncle_fixture() -> (MockChain, Block, Header) {
        let genesis = genesis();
        let parent = child_of(&genesis, 20);
        let block_header = child_of(&parent, 20);
        let mut uncle = child_of(&genesis, 21);
        uncle.coinbase = alloy_primitives::Address::repeat_byte(0x99);

        let chain = MockChain::new()
            .with_block(Block::new(genesis, Vec::new(), Vec::new()))
            .with_block(Block::new(parent, Vec::new(), Vec::new()));
        (chain, Block::new(block_header, Vec::new(), Vec::new()), uncle)
    }
}
