use log::trace;

use super::LOG_TARGET;
use super::slot::{Claim, WinnerSlot};
use crate::blockchain::{BlockHasher, BlockTemplate, meets_difficulty};

/// How a single worker's search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Found a nonce and won the slot.
    Won { attempts: u64 },
    /// Found a nonce but another worker had already claimed the slot.
    LostRace { attempts: u64 },
    /// Observed the stop signal before finding anything.
    Cancelled { attempts: u64 },
    /// Attempt budget spent or stride ran past `u64::MAX`.
    Exhausted { attempts: u64 },
}

impl WorkerOutcome {
    pub fn attempts(&self) -> u64 {
        match *self {
            Self::Won { attempts }
            | Self::LostRace { attempts }
            | Self::Cancelled { attempts }
            | Self::Exhausted { attempts } => attempts,
        }
    }
}

/// Everything a worker needs, borrowed from the `solve` call.
pub struct WorkerJob<'a> {
    pub id: usize,
    pub stride: usize,
    pub template: &'a BlockTemplate,
    pub hasher: &'a dyn BlockHasher,
    pub difficulty: u32,
    pub max_attempts: Option<u64>,
}

/// Search nonces `id, id + stride, id + 2 * stride, ...` until a hash meets
/// the target, the slot is claimed, or the budget runs out.
pub fn search(job: WorkerJob<'_>, slot: &WinnerSlot) -> WorkerOutcome {
    let mut next = Some(job.id as u64);
    let mut attempts: u64 = 0;

    loop {
        if slot.should_stop() {
            return WorkerOutcome::Cancelled { attempts };
        }
        if job.max_attempts.is_some_and(|max| attempts >= max) {
            return WorkerOutcome::Exhausted { attempts };
        }
        let Some(nonce) = next else {
            return WorkerOutcome::Exhausted { attempts };
        };

        let hash = job.template.hash_with(job.hasher, nonce);
        attempts += 1;

        if meets_difficulty(&hash, job.difficulty) {
            trace!(target: LOG_TARGET, "worker {} hit nonce {} -> {}", job.id, nonce, hash);
            let claim = Claim {
                nonce,
                hash,
                worker: job.id,
            };
            return match slot.publish(claim) {
                Ok(()) => WorkerOutcome::Won { attempts },
                Err(_) => WorkerOutcome::LostRace { attempts },
            };
        }

        next = nonce.checked_add(job.stride as u64);
    }
}
