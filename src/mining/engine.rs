use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::LOG_TARGET;
use super::slot::{SlotError, WinnerSlot};
use super::worker::{self, WorkerJob, WorkerOutcome};
use crate::blockchain::{BlockHasher, BlockTemplate};
use crate::config::MinerConfig;
use crate::error::MiningError;

/// The adopted result of one `solve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub hash: String,
    /// Worker that won the slot.
    pub worker: usize,
    /// Hashes computed across all workers.
    pub attempts: u64,
    /// Workers that found a valid nonce after the slot was already claimed.
    pub lost_races: usize,
    pub elapsed: Duration,
}

/// Parallel proof-of-work search over a fixed pool of OS threads.
#[derive(Clone)]
pub struct Miner {
    hasher: Arc<dyn BlockHasher>,
    max_attempts_per_worker: Option<u64>,
}

impl Miner {
    pub fn new(hasher: Arc<dyn BlockHasher>) -> Self {
        Self {
            hasher,
            max_attempts_per_worker: None,
        }
    }

    pub fn from_config(hasher: Arc<dyn BlockHasher>, config: &MinerConfig) -> Self {
        Self::new(hasher).with_attempt_budget(config.max_attempts_per_worker)
    }

    /// Cap the number of hashes each worker may try. `None` searches until found.
    pub fn with_attempt_budget(mut self, max_attempts_per_worker: Option<u64>) -> Self {
        self.max_attempts_per_worker = max_attempts_per_worker;
        self
    }

    pub fn hasher(&self) -> &Arc<dyn BlockHasher> {
        &self.hasher
    }

    pub fn max_attempts_per_worker(&self) -> Option<u64> {
        self.max_attempts_per_worker
    }

    /// Find a nonce whose hash has `difficulty` leading zero hex digits.
    ///
    /// Worker `k` of `worker_count` tries nonces `k, k + worker_count, ...`.
    /// The first worker to claim the shared slot wins; the call returns only
    /// after every worker has exited.
    pub fn solve(
        &self,
        template: &BlockTemplate,
        difficulty: u32,
        worker_count: usize,
    ) -> Result<Solution, MiningError> {
        if worker_count == 0 {
            return Err(MiningError::InvalidWorkerCount);
        }
        let max = self.hasher.hex_len();
        if difficulty as usize > max {
            return Err(MiningError::InvalidDifficulty { difficulty, max });
        }

        let start = Instant::now();

        // Every hash satisfies an empty prefix.
        if difficulty == 0 {
            return Ok(Solution {
                nonce: 0,
                hash: template.hash_with(self.hasher.as_ref(), 0),
                worker: 0,
                attempts: 1,
                lost_races: 0,
                elapsed: start.elapsed(),
            });
        }

        debug!(
            target: LOG_TARGET,
            "mining block #{} at difficulty {} with {} workers",
            template.index, difficulty, worker_count
        );

        let slot = WinnerSlot::new();
        let outcomes = self.run_workers(template, difficulty, worker_count, &slot)?;
        // All workers are joined, so a claim is either absent or fully written.
        debug_assert_ne!(slot.get().err(), Some(SlotError::Incomplete));

        let attempts: u64 = outcomes.iter().map(WorkerOutcome::attempts).sum();
        let lost_races = outcomes
            .iter()
            .filter(|o| matches!(o, WorkerOutcome::LostRace { .. }))
            .count();

        match slot.into_winner() {
            Some(claim) => {
                let elapsed = start.elapsed();
                info!(
                    target: LOG_TARGET,
                    "block #{} mined by worker {}: nonce={} hash={} attempts={} in {:.3}s",
                    template.index,
                    claim.worker,
                    claim.nonce,
                    claim.hash,
                    attempts,
                    elapsed.as_secs_f64()
                );
                if lost_races > 0 {
                    debug!(target: LOG_TARGET, "{} late finds discarded", lost_races);
                }
                Ok(Solution {
                    nonce: claim.nonce,
                    hash: claim.hash,
                    worker: claim.worker,
                    attempts,
                    lost_races,
                    elapsed,
                })
            }
            None => {
                let attempts_per_worker = self.max_attempts_per_worker.unwrap_or(u64::MAX);
                warn!(
                    target: LOG_TARGET,
                    "block #{} not mined: {} workers spent {} attempts each",
                    template.index, worker_count, attempts_per_worker
                );
                Err(MiningError::MiningTimeout {
                    workers: worker_count,
                    attempts_per_worker,
                })
            }
        }
    }

    /// Spawn the pool inside a scope and join every worker before returning.
    fn run_workers(
        &self,
        template: &BlockTemplate,
        difficulty: u32,
        worker_count: usize,
        slot: &WinnerSlot,
    ) -> Result<Vec<WorkerOutcome>, MiningError> {
        let hasher = self.hasher.as_ref();
        let max_attempts = self.max_attempts_per_worker;

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(worker_count);
            let mut spawn_error = None;

            for id in 0..worker_count {
                let job = WorkerJob {
                    id,
                    stride: worker_count,
                    template,
                    hasher,
                    difficulty,
                    max_attempts,
                };
                let spawned = thread::Builder::new()
                    .name(format!("pow-worker-{id}"))
                    .spawn_scoped(s, move || worker::search(job, slot));
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(e) => {
                        slot.abort();
                        spawn_error = Some(MiningError::Spawn(e));
                        break;
                    }
                }
            }

            let mut outcomes = Vec::with_capacity(handles.len());
            let mut failure = spawn_error;
            for (id, handle) in handles {
                match handle.join() {
                    Ok(outcome) => {
                        debug!(target: LOG_TARGET, "worker {} finished: {:?}", id, outcome);
                        outcomes.push(outcome);
                    }
                    Err(_) => {
                        slot.abort();
                        failure.get_or_insert(MiningError::WorkerPanicked(id));
                    }
                }
            }

            match failure {
                Some(e) => Err(e),
                None => Ok(outcomes),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Miner;
    use crate::blockchain::{BlockHasher, BlockTemplate, Sha256Hasher, meets_difficulty};
    use crate::error::MiningError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    fn miner() -> Miner {
        Miner::new(Arc::new(Sha256Hasher))
    }

    /// Every hash is a solution, but no hash is released until all workers
    /// are hashing at the same time.
    struct Rendezvous {
        barrier: Barrier,
        calls: AtomicUsize,
    }

    impl BlockHasher for Rendezvous {
        fn digest(&self, preimage: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.barrier.wait();
            std::thread::sleep(Duration::from_millis(5));
            forced(preimage)
        }

        fn hex_len(&self) -> usize {
            64
        }
    }

    fn forced(preimage: &str) -> String {
        let tail = Sha256Hasher.digest(preimage);
        format!("0000{}", &tail[4..])
    }

    struct Panicking;

    impl BlockHasher for Panicking {
        fn digest(&self, _preimage: &str) -> String {
            panic!("hasher failure");
        }

        fn hex_len(&self) -> usize {
            64
        }
    }

    #[test]
    fn solution_meets_target_and_reproduces() {
        let template = BlockTemplate::new(1, "Block 1 Data", "prev");
        let sol = miner().solve(&template, 2, 4).unwrap();
        assert!(sol.hash.starts_with("00"));
        assert_eq!(sol.hash, template.hash_with(&Sha256Hasher, sol.nonce));
        assert_eq!(sol.nonce % 4, sol.worker as u64);
        assert!(sol.attempts >= 1);
    }

    #[test]
    fn difficulty_zero_accepts_nonce_zero() {
        let template = BlockTemplate::new(0, "Genesis Block", "");
        for workers in [1, 2, 4, 8] {
            let sol = miner().solve(&template, 0, workers).unwrap();
            assert_eq!(sol.nonce, 0);
            assert_eq!(sol.attempts, 1);
            assert_eq!(sol.hash, template.hash_with(&Sha256Hasher, 0));
        }
    }

    #[test]
    fn worker_count_does_not_change_validity() {
        let template = BlockTemplate::new(5, "Block 5 Data", "abc");
        for workers in [1, 2, 4, 8] {
            let sol = miner().solve(&template, 2, workers).unwrap();
            assert!(meets_difficulty(&sol.hash, 2), "workers={workers}");
            assert!(sol.worker < workers);
        }
    }

    #[test]
    fn single_worker_finds_smallest_nonce() {
        let template = BlockTemplate::new(2, "Block 2 Data", "tail");
        let sol = miner().solve(&template, 1, 1).unwrap();
        let first = (0u64..)
            .find(|n| template.hash_with(&Sha256Hasher, *n).starts_with('0'))
            .unwrap();
        assert_eq!(sol.nonce, first);
        assert_eq!(sol.attempts, first + 1);
    }

    #[test]
    fn simultaneous_finds_publish_exactly_one_winner() {
        let workers = 4;
        let hasher = Arc::new(Rendezvous {
            barrier: Barrier::new(workers),
            calls: AtomicUsize::new(0),
        });
        let miner = Miner::new(hasher.clone());
        let template = BlockTemplate::new(1, "race", "prev");

        let sol = miner.solve(&template, 4, workers).unwrap();

        assert_eq!(hasher.calls.load(Ordering::SeqCst), workers);
        assert_eq!(sol.lost_races, workers - 1);
        assert_eq!(sol.nonce, sol.worker as u64);
        assert_eq!(sol.hash, forced(&template.preimage(sol.nonce)));
    }

    #[test]
    fn attempt_budget_times_out() {
        let template = BlockTemplate::new(1, "Block 1 Data", "prev");
        let miner = miner().with_attempt_budget(Some(1));
        match miner.solve(&template, 12, 2) {
            Err(MiningError::MiningTimeout {
                workers,
                attempts_per_worker,
            }) => {
                assert_eq!(workers, 2);
                assert_eq!(attempts_per_worker, 1);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn rejects_difficulty_longer_than_hash() {
        let template = BlockTemplate::new(1, "x", "p");
        assert!(matches!(
            miner().solve(&template, 65, 2),
            Err(MiningError::InvalidDifficulty {
                difficulty: 65,
                max: 64
            })
        ));
    }

    #[test]
    fn rejects_zero_workers() {
        let template = BlockTemplate::new(1, "x", "p");
        assert!(matches!(
            miner().solve(&template, 1, 0),
            Err(MiningError::InvalidWorkerCount)
        ));
    }

    #[test]
    fn worker_panic_is_reported() {
        let template = BlockTemplate::new(1, "x", "p");
        let miner = Miner::new(Arc::new(Panicking));
        assert!(matches!(
            miner.solve(&template, 1, 3),
            Err(MiningError::WorkerPanicked(_))
        ));
    }
}
