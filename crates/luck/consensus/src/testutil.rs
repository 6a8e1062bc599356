//! Shared fixtures for the engine tests.

use std::collections::HashMap;

use alloy_primitives::{Address, B256, U256};

use luck_primitives::{
    encode_nonce, Block, ChainConfig, ChainReader, Header, State, LUCK_MAINNET,
};

use crate::{difficulty, pow};

/// In-memory chain view backed by hash+number keyed maps.
pub(crate) struct MockChain {
    headers: HashMap<(B256, u64), Header>,
    blocks: HashMap<(B256, u64), Block>,
    config: ChainConfig,
}

impl MockChain {
    pub(crate) fn new() -> Self {
        Self {
            headers: HashMap::new(),
            blocks: HashMap::new(),
            config: LUCK_MAINNET.clone(),
        }
    }

    pub(crate) fn with_header(mut self, header: Header) -> Self {
        self.headers.insert((header.hash(), header.number), header);
        self
    }

    pub(crate) fn with_block(mut self, block: Block) -> Self {
        self.headers
            .insert((block.hash(), block.number()), block.header.clone());
        self.blocks.insert((block.hash(), block.number()), block);
        self
    }
}

impl ChainReader for MockChain {
    fn get_header(&self, hash: B256, number: u64) -> Option<Header> {
        self.headers.get(&(hash, number)).cloned()
    }

    fn get_block(&self, hash: B256, number: u64) -> Option<Block> {
        self.blocks.get(&(hash, number)).cloned()
    }

    fn config(&self) -> &ChainConfig {
        &self.config
    }
}

/// Balance-tracking state stub with a root that commits to the credit log.
#[derive(Default)]
pub(crate) struct MockState {
    pub(crate) balances: HashMap<Address, U256>,
    credits: u64,
}

impl State for MockState {
    fn add_balance(&mut self, addr: Address, amount: U256) {
        let entry = self.balances.entry(addr).or_default();
        *entry += amount;
        self.credits += 1;
    }

    fn intermediate_root(&mut self, delete_empty_objects: bool) -> B256 {
        let mut root = B256::ZERO;
        root.0[0] = self.credits as u8;
        root.0[1] = delete_empty_objects as u8;
        root
    }
}

pub(crate) fn genesis() -> Header {
    Header {
        number: 0,
        time: 1_700_000_000,
        gas_limit: 8_000_000,
        ..Default::default()
    }
}

/// A structurally valid, unsealed child `delta` seconds after `parent`,
/// carrying the retarget-correct `(basis, alpha)`.
pub(crate) fn child_of(parent: &Header, delta: u64) -> Header {
    let number = parent.number + 1;
    let time = parent.time + delta;
    let (basis, alpha) = difficulty::calc_params(number, time, parent);
    Header {
        parent_hash: parent.hash(),
        coinbase: Address::repeat_byte(0x11),
        number,
        time,
        gas_limit: parent.gas_limit,
        basis,
        difficulty_alpha: alpha,
        ..Default::default()
    }
}

/// A child of `parent` with a full two-stage seal mined in-process.
pub(crate) fn sealed_child_of(parent: &Header, delta: u64, coinbase: Address) -> Header {
    let mut header = child_of(parent, delta);
    header.coinbase = coinbase;

    let mut first = 0u64;
    while pow::seal_luck(&header, first) >= header.difficulty_alpha {
        first += 1;
    }
    header.first_nonce = encode_nonce(first);
    header.lucky = pow::calc_luck(&header, first);
    header.difficulty_beta = difficulty::calc_beta(header.lucky, header.basis);
    header.difficulty = difficulty::calc_difficulty(&header);

    let mut second = 0u64;
    while pow::seal_block(&header, second) >= header.difficulty_beta {
        second += 1;
    }
    header.second_nonce = encode_nonce(second);
    header
}
