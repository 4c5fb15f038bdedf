use serde::{Deserialize, Serialize};

use super::GENESIS_PAYLOAD;
use super::hash::{BlockHasher, meets_difficulty};

/// The immutable part of a block: everything except the proof-of-work.
///
/// Mining workers share one template by reference and only vary the nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub index: u64,
    pub logical_time: i64, // mirrors `index`, not wall-clock time
    pub payload: String,
    pub previous_hash: String,
}

impl BlockTemplate {
    /// Build the template for position `index` on top of `previous_hash`.
    pub fn new(index: u64, payload: impl Into<String>, previous_hash: impl Into<String>) -> Self {
        Self {
            index,
            logical_time: index as i64,
            payload: payload.into(),
            previous_hash: previous_hash.into(),
        }
    }

    /// Hash input for a given nonce: index, time, payload, nonce and
    /// previous hash concatenated without separators.
    pub fn preimage(&self, nonce: u64) -> String {
        format!(
            "{}{}{}{}{}",
            self.index, self.logical_time, self.payload, nonce, self.previous_hash
        )
    }

    pub fn hash_with(&self, hasher: &dyn BlockHasher, nonce: u64) -> String {
        hasher.digest(&self.preimage(nonce))
    }
}

/// A sealed block. Once constructed its nonce and hash never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    template: BlockTemplate,
    nonce: u64,
    hash: String,
    difficulty: u32, // target it was sealed at; not part of the preimage
}

impl Block {
    /// The genesis block. It is hashed like every other block but carries
    /// no proof-of-work (difficulty 0).
    pub fn genesis(hasher: &dyn BlockHasher) -> Self {
        let template = BlockTemplate::new(0, GENESIS_PAYLOAD, "");
        let hash = template.hash_with(hasher, 0);
        Self {
            template,
            nonce: 0,
            hash,
            difficulty: 0,
        }
    }

    /// Seal `template` with a solved nonce/hash pair.
    pub fn seal(template: BlockTemplate, nonce: u64, hash: String, difficulty: u32) -> Self {
        Self {
            template,
            nonce,
            hash,
            difficulty,
        }
    }

    pub fn index(&self) -> u64 {
        self.template.index
    }

    pub fn logical_time(&self) -> i64 {
        self.template.logical_time
    }

    pub fn payload(&self) -> &str {
        &self.template.payload
    }

    pub fn previous_hash(&self) -> &str {
        &self.template.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn template(&self) -> &BlockTemplate {
        &self.template
    }

    /// Recompute the hash from the block's fields and stored nonce.
    pub fn compute_hash(&self, hasher: &dyn BlockHasher) -> String {
        self.template.hash_with(hasher, self.nonce)
    }

    /// The stored hash reproduces and satisfies the recorded difficulty.
    /// (Does NOT validate chain linkage.)
    pub fn is_valid(&self, hasher: &dyn BlockHasher) -> bool {
        self.hash == self.compute_hash(hasher) && meets_difficulty(&self.hash, self.difficulty)
    }
}
