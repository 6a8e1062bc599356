//! The memory-hard hash oracle behind both seal stages.
//!
//! Three hash roles feed the two-stage seal, each over its own RLP field
//! list and its own suffix of the parent hash as salt:
//!
//! - [`seal_luck`]: first-stage value, scaled down by [`HASH_SCALE`]
//! - [`calc_luck`]: the bounded luck draw, reduced mod [`MAX_LUCK`]
//! - [`seal_block`]: second-stage value, scaled down by [`HASH_SCALE`]
//!
//! The field lists, the presence of the height only in the luck draw, and
//! the two distinct salt offsets are consensus-defining: changing any of
//! them changes every hash on the chain.

use alloy_primitives::{Address, Bloom, Bytes, B256, U256};
use alloy_rlp::RlpEncodable;
use argon2::{Algorithm, Argon2, Params, Version};
use once_cell::sync::Lazy;
use sha3::{Digest, Keccak256};

use luck_primitives::Header;

/// Divisor normalizing raw 256-bit hash values before target comparison.
pub const HASH_SCALE: U256 = U256::from_limbs([4_000_000_000_000_000_000, 0, 0, 0]);

/// Exclusive upper bound of the luck draw.
pub const MAX_LUCK: U256 = U256::from_limbs([200_000_000, 0, 0, 0]);

/// Argon2 memory cost in KiB. Consensus-fixed.
pub const ARGON_MEMORY_KIB: u32 = 1024;

/// Argon2 pass count. Consensus-fixed.
pub const ARGON_PASSES: u32 = 1;

/// Argon2 lane count. Consensus-fixed.
pub const ARGON_LANES: u32 = 1;

/// Parent-hash offset of the 10-byte salt used by both seal stages.
const SEAL_SALT_OFFSET: usize = 22;

/// Parent-hash offset of the 12-byte salt used by the luck draw.
const LUCK_SALT_OFFSET: usize = 20;

static ARGON: Lazy<Argon2<'static>> = Lazy::new(|| {
    let params = Params::new(ARGON_MEMORY_KIB, ARGON_PASSES, ARGON_LANES, Some(32))
        .expect("consensus argon2 parameters are in range");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
});

/// Argon2id digest of `message` keyed by `salt`.
pub fn argon_hash(message: &[u8], salt: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    ARGON
        .hash_password_into(message, salt, &mut out)
        .expect("salt suffixes satisfy the argon2 length bounds");
    out
}

#[derive(RlpEncodable)]
struct SealLuckInput {
    parent_hash: B256,
    coinbase: Address,
    time: u64,
    nonce: u64,
}

/// First-stage seal value for `nonce`; must fall below `difficulty_alpha`.
pub fn seal_luck(header: &Header, nonce: u64) -> U256 {
    let input = SealLuckInput {
        parent_hash: header.parent_hash,
        coinbase: header.coinbase,
        time: header.time,
        nonce,
    };
    let hash = argon_hash(
        &alloy_rlp::encode(&input),
        &header.parent_hash[SEAL_SALT_OFFSET..],
    );
    U256::from_be_bytes(hash) / HASH_SCALE
}

#[derive(RlpEncodable)]
struct CalcLuckInput {
    parent_hash: B256,
    coinbase: Address,
    time: u64,
    number: u64,
    nonce: u64,
}

/// The luck draw keyed by the first-stage nonce, bounded by [`MAX_LUCK`].
pub fn calc_luck(header: &Header, nonce: u64) -> U256 {
    let input = CalcLuckInput {
        parent_hash: header.parent_hash,
        coinbase: header.coinbase,
        time: header.time,
        number: header.number,
        nonce,
    };
    let hash = argon_hash(
        &alloy_rlp::encode(&input),
        &header.parent_hash[LUCK_SALT_OFFSET..],
    );
    U256::from_be_bytes(hash) % MAX_LUCK
}

#[derive(RlpEncodable)]
struct SealBlockInput {
    parent_hash: B256,
    uncle_hash: B256,
    coinbase: Address,
    root: B256,
    tx_hash: B256,
    receipt_hash: B256,
    bloom: Bloom,
    number: u64,
    gas_limit: u64,
    gas_used: u64,
    time: u64,
    extra: Bytes,
    basis: U256,
    lucky: U256,
    difficulty_alpha: U256,
    difficulty_beta: U256,
    nonce: u64,
}

/// Second-stage seal value for `nonce`; must fall below `difficulty_beta`.
///
/// Commits to the whole header up to and including the first-stage outcome,
/// so the second nonce cannot be reused across luck draws.
pub fn seal_block(header: &Header, nonce: u64) -> U256 {
    let input = SealBlockInput {
        parent_hash: header.parent_hash,
        uncle_hash: header.uncle_hash,
        coinbase: header.coinbase,
        root: header.root,
        tx_hash: header.tx_hash,
        receipt_hash: header.receipt_hash,
        bloom: header.bloom,
        number: header.number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        time: header.time,
        extra: header.extra.clone(),
        basis: header.basis,
        lucky: header.lucky,
        difficulty_alpha: header.difficulty_alpha,
        difficulty_beta: header.difficulty_beta,
        nonce,
    };
    let hash = argon_hash(
        &alloy_rlp::encode(&input),
        &header.parent_hash[SEAL_SALT_OFFSET..],
    );
    U256::from_be_bytes(hash) / HASH_SCALE
}

#[derive(RlpEncodable)]
struct SealHashInput {
    parent_hash: B256,
    uncle_hash: B256,
    coinbase: Address,
    root: B256,
    tx_hash: B256,
    receipt_hash: B256,
    bloom: Bloom,
    number: u64,
    gas_limit: u64,
    gas_used: u64,
    time: u64,
    extra: Bytes,
}

/// Keccak-256 over the pre-seal header fields; the hash miners work against.
pub fn seal_hash(header: &Header) -> B256 {
    let input = SealHashInput {
        parent_hash: header.parent_hash,
        uncle_hash: header.uncle_hash,
        coinbase: header.coinbase,
        root: header.root,
        tx_hash: header.tx_hash,
        receipt_hash: header.receipt_hash,
        bloom: header.bloom,
        number: header.number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        time: header.time,
        extra: header.extra.clone(),
    };

    let mut hasher = Keccak256::new();
    hasher.update(alloy_rlp::encode(&input));
    B256::from_slice(&hasher.finalize())
}
