use std::time::{Duration, Instant};

use log::info;
use serde::{Deserialize, Serialize};

use crate::blockchain::Blockchain;
use crate::config::ScheduleConfig;
use crate::error::ChainError;

/// Timing for one difficulty level of a schedule run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    pub difficulty: u32,
    pub blocks: u32,
    pub total: Duration,
    pub average: Duration,
}

/// Mine `blocks_per_difficulty` blocks at every difficulty in the schedule,
/// in increasing order, onto `chain`.
///
/// Payloads are `"Block {i} Data"` with `i` restarting at 1 for each level.
/// Stops at the first failed append; blocks already appended stay.
pub fn run_schedule(
    chain: &mut Blockchain,
    config: &ScheduleConfig,
) -> Result<Vec<StepSummary>, ChainError> {
    let workers = config.miner.worker_count;
    let mut summaries = Vec::new();

    for difficulty in config.difficulties() {
        let start = Instant::now();
        for i in 1..=config.blocks_per_difficulty {
            chain.append(format!("Block {i} Data"), difficulty, workers)?;
        }
        let total = start.elapsed();
        let average = total / config.blocks_per_difficulty.max(1);

        info!(
            "difficulty {}: {} blocks in {:.3}s (avg {:.6}s)",
            difficulty,
            config.blocks_per_difficulty,
            total.as_secs_f64(),
            average.as_secs_f64()
        );
        summaries.push(StepSummary {
            difficulty,
            blocks: config.blocks_per_difficulty,
            total,
            average,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::run_schedule;
    use crate::blockchain::{Blockchain, Sha256Hasher};
    use crate::config::{MinerConfig, ScheduleConfig};
    use crate::error::{ChainError, MiningError};
    use crate::mining::Miner;
    use crate::report::MemorySink;
    use std::sync::Arc;

    fn config(min: u32, max: u32, blocks: u32) -> ScheduleConfig {
        ScheduleConfig {
            min_difficulty: min,
            max_difficulty: max,
            blocks_per_difficulty: blocks,
            miner: MinerConfig {
                difficulty: max,
                worker_count: 2,
                max_attempts_per_worker: None,
            },
        }
    }

    #[test]
    fn mines_every_level_in_order() {
        let sink = MemorySink::new();
        let mut chain = Blockchain::default().with_sink(sink.clone());

        let summaries = run_schedule(&mut chain, &config(0, 2, 3)).unwrap();

        assert_eq!(
            summaries.iter().map(|s| s.difficulty).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(summaries.iter().all(|s| s.blocks == 3));
        assert_eq!(chain.len(), 1 + 9);
        assert_eq!(chain.blocks()[4].payload(), "Block 1 Data");
        assert_eq!(chain.blocks()[4].difficulty(), 1);
        assert!(chain.is_valid_chain());

        let reports = sink.reports();
        assert_eq!(reports.len(), 9);
        assert_eq!(reports[8].difficulty, 2);
    }

    #[test]
    fn pinned_difficulty_mines_one_level() {
        let cfg = ScheduleConfig::from_lookup(|key: &str| match key {
            "POW_DIFFICULTY" => Some("2".to_string()),
            "POW_BLOCKS_PER_DIFFICULTY" => Some("3".to_string()),
            "POW_WORKERS" => Some("2".to_string()),
            _ => None,
        });
        let mut chain = Blockchain::default();

        let summaries = run_schedule(&mut chain, &cfg).unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].difficulty, 2);
        let mined: Vec<u32> = chain.blocks()[1..].iter().map(|b| b.difficulty()).collect();
        assert_eq!(mined, vec![2, 2, 2]);
        assert!(chain.is_valid_chain());
    }

    #[test]
    fn stops_at_first_failure() {
        let miner = Miner::new(Arc::new(Sha256Hasher)).with_attempt_budget(Some(1));
        let mut chain = Blockchain::new(miner);

        let err = run_schedule(&mut chain, &config(0, 16, 2)).unwrap_err();

        assert!(matches!(
            err,
            ChainError::Mining(MiningError::MiningTimeout { .. })
        ));
        // difficulty 0 never needs more than one attempt
        assert!(chain.len() >= 3);
        assert!(chain.is_valid_chain());
    }
}
