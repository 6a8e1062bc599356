//! The two-phase nonce search.
//!
//! Sealing spawns one detached search thread per call. Phase one walks the
//! first nonce until the luck seal clears `difficulty_alpha`, which fixes
//! the luck draw and with it the second-stage target; phase two walks the
//! second nonce until the block seal clears `difficulty_beta`. Both phases
//! poll the stop flag between hash attempts. A finished seal is delivered
//! without blocking: if the host is not listening, the block is dropped and
//! the drop is logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info};

use luck_primitives::{encode_nonce, Block};

use crate::difficulty;
use crate::error::ConsensusError;
use crate::pow;
use crate::LuckPow;

impl LuckPow {
    /// Draw the two starting nonces, seeding the shared source on first use.
    pub(crate) fn seed_nonces(&self) -> Result<(u64, u64), ConsensusError> {
        let mut guard = self.rand.lock();
        if guard.is_none() {
            let rng = StdRng::from_rng(OsRng)
                .map_err(|e| ConsensusError::SealerRng(e.to_string()))?;
            *guard = Some(rng);
        }
        let rng = guard.as_mut().expect("nonce source seeded above");
        Ok((rng.gen(), rng.gen()))
    }
}

/// Spawn the search thread for `block`, reporting the sealed block on
/// `results`. Returns the thread handle; the search ends on success or when
/// `stop` is raised.
pub(crate) fn seal(
    engine: &LuckPow,
    block: Block,
    results: mpsc::Sender<Block>,
    stop: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, ConsensusError> {
    let (first_seed, second_seed) = engine.seed_nonces()?;

    let handle = thread::Builder::new()
        .name("luck-sealer".into())
        .spawn(move || search(block, first_seed, second_seed, stop, results))
        .expect("spawn sealer thread");
    Ok(handle)
}

fn search(
    block: Block,
    first_seed: u64,
    second_seed: u64,
    stop: Arc<AtomicBool>,
    results: mpsc::Sender<Block>,
) {
    let mut header = block.header.clone();
    let number = header.number;

    // Phase one: find a first nonce whose luck seal clears alpha.
    let mut curr_first_nonce = first_seed;
    loop {
        if stop.load(Ordering::Relaxed) {
            debug!(
                target: "luck::sealer",
                block = number,
                nonce = curr_first_nonce,
                "first-nonce search aborted"
            );
            return;
        }
        curr_first_nonce = curr_first_nonce.wrapping_add(1);
        if pow::seal_luck(&header, curr_first_nonce) < header.difficulty_alpha {
            break;
        }
    }

    let first_nonce = curr_first_nonce;
    let lucky = pow::calc_luck(&header, first_nonce);
    header.first_nonce = encode_nonce(first_nonce);
    header.lucky = lucky;
    header.difficulty_beta = difficulty::calc_beta(lucky, header.basis);
    header.difficulty = difficulty::calc_difficulty(&header);

    // Phase two: find a second nonce whose block seal clears beta.
    let mut curr_second_nonce = second_seed;
    loop {
        if stop.load(Ordering::Relaxed) {
            debug!(
                target: "luck::sealer",
                block = number,
                nonce = curr_second_nonce,
                "second-nonce search aborted"
            );
            return;
        }
        curr_second_nonce = curr_second_nonce.wrapping_add(1);
        if pow::seal_block(&header, curr_second_nonce) < header.difficulty_beta {
            break;
        }
    }

    header.second_nonce = encode_nonce(curr_second_nonce);
    // Detach the sealed header from the search copy before handing it out.
    let sealed = header.clone();
    match results.try_send(block.with_seal(sealed)) {
        Ok(()) => info!(
            target: "luck::sealer",
            block = number,
            lucky = %lucky,
            first_nonce,
            second_nonce = curr_second_nonce,
            "block sealed and reported"
        ),
        Err(_) => debug!(
            target: "luck::sealer",
            block = number,
            "sealed block dropped, host not ready"
        ),
    }
}
