use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{info, warn};

use super::difficulty::{DifficultyPolicy, FixedDifficulty};
use super::hash::{BlockHasher, Sha256Hasher};
use super::{Block, BlockTemplate, DEFAULT_DIFFICULTY, GENESIS_PAYLOAD};
use crate::error::ChainError;
use crate::mining::Miner;
use crate::report::{BlockReport, NullSink, ReportSink};

const LOG_TARGET: &str = "pow_chain::chain";

/// In-memory, append-only chain of mined blocks.
///
/// Appends take `&mut self`, so only one can be in flight per chain; the
/// parallelism lives inside each `append`, in the miner's worker pool.
pub struct Blockchain {
    blocks: Vec<Block>,
    miner: Miner,
    sink: Box<dyn ReportSink>,
    policy: Box<dyn DifficultyPolicy>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(Miner::new(Arc::new(Sha256Hasher)))
    }
}

impl Blockchain {
    /// Initialize a new blockchain with a genesis block sealed by the
    /// miner's hasher.
    pub fn new(miner: Miner) -> Self {
        let genesis = Block::genesis(miner.hasher().as_ref());
        Self {
            blocks: vec![genesis],
            miner,
            sink: Box::new(NullSink),
            policy: Box::new(FixedDifficulty(DEFAULT_DIFFICULTY)),
        }
    }

    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_policy(mut self, policy: impl DifficultyPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: genesis is always present.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn miner(&self) -> &Miner {
        &self.miner
    }

    fn hasher(&self) -> &dyn BlockHasher {
        self.miner.hasher().as_ref()
    }

    /// Mine `payload` on top of the current tail and append it.
    ///
    /// All-or-nothing: on error the chain is unchanged and nothing is reported.
    pub fn append(
        &mut self,
        payload: impl Into<String>,
        difficulty: u32,
        worker_count: usize,
    ) -> Result<&Block, ChainError> {
        let index = self.blocks.len() as u64;
        let template = BlockTemplate::new(index, payload, self.last_block().hash());

        let solution = self.miner.solve(&template, difficulty, worker_count)?;
        let block = Block::seal(template, solution.nonce, solution.hash, difficulty);
        self.push_checked(block)?;

        let report = BlockReport::new(
            index,
            difficulty,
            solution.elapsed,
            solution.attempts,
            worker_count,
        );
        let sink = &self.sink;
        if panic::catch_unwind(AssertUnwindSafe(|| sink.record(&report))).is_err() {
            warn!(target: LOG_TARGET, "report sink panicked on block #{}", index);
        }
        self.policy.observe(&report);

        Ok(self.last_block())
    }

    /// Append using the chain's difficulty policy.
    pub fn mine_next(
        &mut self,
        payload: impl Into<String>,
        worker_count: usize,
    ) -> Result<&Block, ChainError> {
        let difficulty = self.policy.next_difficulty(self.blocks.len() as u64);
        self.append(payload, difficulty, worker_count)
    }

    /// Accept a block mined elsewhere, after checking position, linkage and work.
    pub fn append_solved(&mut self, block: Block) -> Result<&Block, ChainError> {
        self.push_checked(block)?;
        Ok(self.last_block())
    }

    fn push_checked(&mut self, block: Block) -> Result<(), ChainError> {
        let expected_index = self.blocks.len() as u64;
        if block.index() != expected_index {
            return Err(ChainError::IndexMismatch {
                expected: expected_index,
                found: block.index(),
            });
        }

        let tail = self.last_block().hash();
        if block.previous_hash() != tail {
            warn!(
                target: LOG_TARGET,
                "rejecting block #{}: links to {} but tail is {}",
                block.index(),
                block.previous_hash(),
                tail
            );
            return Err(ChainError::ChainLinkageViolation {
                index: block.index(),
                expected: tail.to_string(),
                found: block.previous_hash().to_string(),
            });
        }

        if !block.is_valid(self.hasher()) {
            return Err(ChainError::InsufficientWork {
                index: block.index(),
                hash: block.hash().to_string(),
                difficulty: block.difficulty(),
            });
        }

        info!(
            target: LOG_TARGET,
            "appended block #{} (difficulty {}, nonce {})",
            block.index(),
            block.difficulty(),
            block.nonce()
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Validate the entire chain: genesis shape, linkage, hashes and PoW.
    pub fn is_valid_chain(&self) -> bool {
        let hasher = self.hasher();

        let Some(genesis) = self.blocks.first() else {
            return false;
        };
        if genesis.index() != 0
            || genesis.nonce() != 0
            || genesis.difficulty() != 0
            || !genesis.previous_hash().is_empty()
            || genesis.payload() != GENESIS_PAYLOAD
            || genesis.hash() != genesis.compute_hash(hasher)
        {
            return false;
        }

        self.blocks.windows(2).enumerate().all(|(i, pair)| {
            let (prev, current) = (&pair[0], &pair[1]);
            current.index() == i as u64 + 1
                && current.previous_hash() == prev.hash()
                && current.is_valid(hasher)
        })
    }
}
