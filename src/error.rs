use thiserror::Error;

/// Failures raised by the mining engine before or during a `solve`.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("difficulty {difficulty} exceeds the hash length of {max} hex digits")]
    InvalidDifficulty { difficulty: u32, max: usize },

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("no solution after {attempts_per_worker} attempts on each of {workers} workers")]
    MiningTimeout {
        workers: usize,
        attempts_per_worker: u64,
    },

    #[error("failed to spawn mining worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("mining worker {0} panicked")]
    WorkerPanicked(usize),
}

/// Failures raised by the chain when appending or validating blocks.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error("block #{index} links to {found}, but the chain tail is {expected}")]
    ChainLinkageViolation {
        index: u64,
        expected: String,
        found: String,
    },

    #[error("block index {found} does not follow chain height {expected}")]
    IndexMismatch { expected: u64, found: u64 },

    #[error("block #{index} hash {hash} does not satisfy difficulty {difficulty}")]
    InsufficientWork {
        index: u64,
        hash: String,
        difficulty: u32,
    },
}

/// Rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Miner(#[from] MiningError),

    #[error("difficulty range {min}..={max} is empty")]
    EmptyDifficultyRange { min: u32, max: u32 },

    #[error("blocks per difficulty must be at least 1")]
    NoBlocks,
}
