//! Concurrent proof-of-work mining over a hash-linked chain of blocks.
//!
//! [`Miner::solve`] races a fixed pool of worker threads over disjoint,
//! strided nonce sequences and adopts exactly one winner.
//! [`Blockchain::append`] builds on it, keeping every block linked to its
//! predecessor.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod mining;
pub mod report;
pub mod schedule;

pub use blockchain::{Block, BlockHasher, BlockTemplate, Blockchain, Sha256Hasher};
pub use config::{MinerConfig, ScheduleConfig};
pub use error::{ChainError, ConfigError, MiningError};
pub use mining::{Miner, Solution};
pub use report::{BlockReport, ReportSink};
pub use schedule::{StepSummary, run_schedule};
