use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// A winning nonce/hash pair and the worker that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub nonce: u64,
    pub hash: String,
    pub worker: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("no worker has claimed the slot yet")]
    NotReady,
    #[error("slot claimed but the winning result is not yet visible")]
    Incomplete,
}

/// Single-writer-wins result cell shared by all workers of one `solve`.
///
/// `claimed` doubles as the cancellation flag: workers poll it before every
/// attempt and stop once it is set. `aborted` stops them without a winner.
#[derive(Debug, Default)]
pub struct WinnerSlot {
    claimed: AtomicBool,
    aborted: AtomicBool,
    winner: OnceLock<Claim>,
}

impl WinnerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some worker has already won.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Whether workers should stop searching.
    pub fn should_stop(&self) -> bool {
        self.is_claimed() || self.aborted.load(Ordering::Acquire)
    }

    /// Stop all workers without publishing a winner.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    /// Try to publish `claim`. Only the first caller wins; everyone else gets
    /// their claim handed back.
    pub fn publish(&self, claim: Claim) -> Result<(), Claim> {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(claim);
        }
        // We hold the claim; nobody else can reach `set`.
        self.winner.set(claim)
    }

    /// Read the winner without consuming the slot.
    pub fn get(&self) -> Result<&Claim, SlotError> {
        if !self.is_claimed() {
            return Err(SlotError::NotReady);
        }
        self.winner.get().ok_or(SlotError::Incomplete)
    }

    /// Consume the slot once all workers have exited.
    pub fn into_winner(self) -> Option<Claim> {
        self.winner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::{Claim, SlotError, WinnerSlot};
    use std::sync::Barrier;

    fn claim(worker: usize) -> Claim {
        Claim {
            nonce: worker as u64,
            hash: format!("0{worker}"),
            worker,
        }
    }

    #[test]
    fn empty_slot_is_not_ready() {
        let slot = WinnerSlot::new();
        assert!(!slot.is_claimed());
        assert_eq!(slot.get(), Err(SlotError::NotReady));
        assert!(slot.into_winner().is_none());
    }

    #[test]
    fn abort_stops_without_winner() {
        let slot = WinnerSlot::new();
        slot.abort();
        assert!(slot.should_stop());
        assert_eq!(slot.get(), Err(SlotError::NotReady));
        assert!(slot.publish(claim(0)).is_ok());
    }

    #[test]
    fn first_publish_wins() {
        let slot = WinnerSlot::new();
        assert!(slot.publish(claim(1)).is_ok());
        assert_eq!(slot.publish(claim(2)), Err(claim(2)));
        assert_eq!(slot.get(), Ok(&claim(1)));
        assert_eq!(slot.into_winner(), Some(claim(1)));
    }

    #[test]
    fn simultaneous_publish_has_one_winner() {
        let threads = 8;
        let slot = WinnerSlot::new();
        let barrier = Barrier::new(threads);

        let wins: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|k| {
                    let slot = &slot;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        slot.publish(claim(k)).is_ok() as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(wins, 1);
        assert!(slot.into_winner().is_some());
    }
}
