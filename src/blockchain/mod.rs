use std::time::Duration;

pub mod block;
pub mod difficulty;
pub mod hash;
pub mod model;

pub use block::{Block, BlockTemplate};
pub use difficulty::{DifficultyPolicy, FixedDifficulty, Retarget, SteppedSchedule};
pub use hash::{BlockHasher, Sha256Hasher, meets_difficulty};
pub use model::Blockchain;

/// Payload of block 0.
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// Target mining time per block for auto-adjust
pub const TARGET_BLOCK_TIME: Duration = Duration::from_secs(1);

/// How many recent blocks to average when adjusting difficulty
pub const DIFF_ADJUST_WINDOW: usize = 10;

/// Tolerance around the target before we adjust (+/- 20%)
pub const DIFF_ADJUST_THRESHOLD_PCT: f64 = 0.20;

/// Difficulty bounds for auto-adjust (keep low to avoid long waits)
pub const DIFF_MIN: u32 = 1;
pub const DIFF_MAX: u32 = 6;
