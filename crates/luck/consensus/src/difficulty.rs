//! Difficulty retarget and derived targets.
//!
//! Every block re-derives `(basis, alpha)` from its parent in two steps:
//! a parameter-regime pre-scale of `basis` alone, then a shared timing
//! adjustment of both against the 20 s target interval. The second-stage
//! target `beta` and the advertised difficulty are pure functions of the
//! sealed header. All arithmetic is integer-exact on `U256`; the
//! multiply-then-divide order below is consensus and must not be refactored
//! into combined fractions.

use alloy_primitives::U256;

use luck_primitives::Header;

use crate::pow::{HASH_SCALE, MAX_LUCK};

/// Target inter-block interval in seconds.
pub const TARGET_BLOCK_INTERVAL_SECS: u64 = 20;

/// Height at which the advertised difficulty switches from the raw luck
/// value to the basis-derived formula.
pub const DIFFICULTY_ADJUST_HEIGHT: u64 = 39_200;

/// Initial `basis`: 2^186 - 1.
pub const INIT_BASIS: U256 = U256::from_limbs([u64::MAX, u64::MAX, (1u64 << 58) - 1, 0]);

/// Initial `alpha`: 2^190 - 1.
pub const INIT_ALPHA: U256 = U256::from_limbs([u64::MAX, u64::MAX, (1u64 << 62) - 1, 0]);

/// Derive `(basis, alpha)` for a header at `number` with timestamp `time`
/// on top of `parent`.
pub fn calc_params(number: u64, time: u64, parent: &Header) -> (U256, U256) {
    if number <= 1 {
        return (INIT_BASIS, INIT_ALPHA);
    }

    let d_alpha = parent.difficulty_alpha;
    let d_beta = parent.difficulty_beta / U256::from(5u64);
    let mut basis = parent.basis;

    // Parameter regime: shrink basis while the first stage is the cheaper
    // of the two, grow it otherwise. Alpha is untouched here.
    if d_alpha < d_beta {
        basis = basis * U256::from(96u64) / U256::from(100u64);
    } else {
        basis = basis * U256::from(105u64) / U256::from(100u64);
    }

    // Timing regime against the 20 s target.
    if time.wrapping_sub(parent.time) > TARGET_BLOCK_INTERVAL_SECS {
        let alpha = d_alpha * U256::from(110u64) / U256::from(100u64);
        basis = basis * U256::from(110u64) / U256::from(100u64);
        (basis, alpha)
    } else {
        let alpha = d_alpha * U256::from(90u64) / U256::from(100u64);
        basis = basis * U256::from(90u64) / U256::from(100u64);
        (basis, alpha)
    }
}

/// Second-stage target: `basis * max^2 / (max - lucky)^2`, evaluated as two
/// multiply-divide rounds so truncation matches every other implementation.
pub fn calc_beta(lucky: U256, basis: U256) -> U256 {
    let ta = MAX_LUCK;
    let tb = MAX_LUCK - lucky;
    basis * ta / tb * ta / tb
}

/// Advertised difficulty of a sealed header.
pub fn calc_difficulty(header: &Header) -> U256 {
    if header.number < DIFFICULTY_ADJUST_HEIGHT {
        header.lucky
    } else if header.basis.is_zero() {
        // A zeroed basis yields a zero beta, which no block seal clears;
        // report zero difficulty instead of dividing by it.
        U256::ZERO
    } else {
        U256::MAX / HASH_SCALE * U256::from(1_000_000u64) / header.basis
    }
}
