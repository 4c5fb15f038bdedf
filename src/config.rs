use std::env;

use crate::blockchain::{DEFAULT_DIFFICULTY, DIFF_MAX, DIFF_MIN};
use crate::error::{ConfigError, MiningError};

/// Blocks mined at each difficulty by the default schedule.
pub const DEFAULT_BLOCKS_PER_DIFFICULTY: u32 = 99;

/// Options recognised by the mining engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerConfig {
    pub difficulty: u32,
    pub worker_count: usize,
    /// `None` means search until a solution turns up.
    pub max_attempts_per_worker: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            worker_count: num_cpus::get(),
            max_attempts_per_worker: None,
        }
    }
}

impl MinerConfig {
    /// Read `POW_DIFFICULTY`, `POW_WORKERS` and `POW_MAX_ATTEMPTS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            difficulty: parse_or(&lookup, "POW_DIFFICULTY", defaults.difficulty),
            worker_count: parse_or(&lookup, "POW_WORKERS", defaults.worker_count),
            max_attempts_per_worker: lookup("POW_MAX_ATTEMPTS").and_then(|v| v.parse().ok()),
        }
    }

    /// Reject values no `solve` call could accept for a hash of `hex_len` digits.
    pub fn validate(&self, hex_len: usize) -> Result<(), MiningError> {
        if self.worker_count == 0 {
            return Err(MiningError::InvalidWorkerCount);
        }
        if self.difficulty as usize > hex_len {
            return Err(MiningError::InvalidDifficulty {
                difficulty: self.difficulty,
                max: hex_len,
            });
        }
        Ok(())
    }
}

/// A stepped run: every difficulty in `min_difficulty..=max_difficulty`,
/// each held for `blocks_per_difficulty` blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub min_difficulty: u32,
    pub max_difficulty: u32,
    pub blocks_per_difficulty: u32,
    pub miner: MinerConfig,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_difficulty: DIFF_MIN,
            max_difficulty: DIFF_MAX - 1,
            blocks_per_difficulty: DEFAULT_BLOCKS_PER_DIFFICULTY,
            miner: MinerConfig::default(),
        }
    }
}

impl ScheduleConfig {
    /// Read the miner options plus `POW_MIN_DIFFICULTY`, `POW_MAX_DIFFICULTY`
    /// and `POW_BLOCKS_PER_DIFFICULTY`.
    ///
    /// A `POW_DIFFICULTY` with no explicit range runs that single level.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let miner = MinerConfig::from_lookup(&lookup);
        let pinned = lookup("POW_DIFFICULTY").and_then(|v| v.trim().parse::<u32>().ok());
        let (min, max) = match pinned {
            Some(d) => (d, d),
            None => (defaults.min_difficulty, defaults.max_difficulty),
        };
        Self {
            min_difficulty: parse_or(&lookup, "POW_MIN_DIFFICULTY", min),
            max_difficulty: parse_or(&lookup, "POW_MAX_DIFFICULTY", max),
            blocks_per_difficulty: parse_or(
                &lookup,
                "POW_BLOCKS_PER_DIFFICULTY",
                defaults.blocks_per_difficulty,
            ),
            miner,
        }
    }

    pub fn validate(&self, hex_len: usize) -> Result<(), ConfigError> {
        if self.min_difficulty > self.max_difficulty {
            return Err(ConfigError::EmptyDifficultyRange {
                min: self.min_difficulty,
                max: self.max_difficulty,
            });
        }
        if self.blocks_per_difficulty == 0 {
            return Err(ConfigError::NoBlocks);
        }
        self.miner.validate(hex_len)?;
        let hardest = MinerConfig {
            difficulty: self.max_difficulty,
            ..self.miner.clone()
        };
        hardest.validate(hex_len)?;
        Ok(())
    }

    pub fn difficulties(&self) -> impl Iterator<Item = u32> {
        self.min_difficulty..=self.max_difficulty
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
