use std::collections::VecDeque;
use std::time::Duration;

use log::debug;

use super::{DIFF_ADJUST_THRESHOLD_PCT, DIFF_ADJUST_WINDOW, DIFF_MAX, DIFF_MIN, TARGET_BLOCK_TIME};
use crate::report::BlockReport;

/// Chooses the difficulty for each new block.
pub trait DifficultyPolicy: Send {
    fn next_difficulty(&mut self, index: u64) -> u32;

    /// Called after every successful append.
    fn observe(&mut self, _report: &BlockReport) {}
}

/// Same difficulty for every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDifficulty(pub u32);

impl DifficultyPolicy for FixedDifficulty {
    fn next_difficulty(&mut self, _index: u64) -> u32 {
        self.0
    }
}

/// Raises difficulty by one every `blocks_per_step` blocks, starting at
/// `min` for block 1 and holding at `max` once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteppedSchedule {
    pub min: u32,
    pub max: u32,
    pub blocks_per_step: u32,
}

impl DifficultyPolicy for SteppedSchedule {
    fn next_difficulty(&mut self, index: u64) -> u32 {
        if index == 0 {
            return 0;
        }
        let step = (index - 1) / u64::from(self.blocks_per_step.max(1));
        let step = u32::try_from(step).unwrap_or(u32::MAX);
        self.min.saturating_add(step).min(self.max)
    }
}

/// Nudges difficulty toward a target block time using a sliding average of
/// observed mining durations.
#[derive(Debug, Clone)]
pub struct Retarget {
    current: u32,
    target: Duration,
    window: usize,
    threshold: f64,
    bounds: (u32, u32),
    recent: VecDeque<Duration>,
}

impl Retarget {
    pub fn new(initial: u32) -> Self {
        Self {
            current: initial.clamp(DIFF_MIN, DIFF_MAX),
            target: TARGET_BLOCK_TIME,
            window: DIFF_ADJUST_WINDOW,
            threshold: DIFF_ADJUST_THRESHOLD_PCT,
            bounds: (DIFF_MIN, DIFF_MAX),
            recent: VecDeque::with_capacity(DIFF_ADJUST_WINDOW),
        }
    }

    pub fn with_target(mut self, target: Duration) -> Self {
        self.target = target;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_bounds(mut self, min: u32, max: u32) -> Self {
        self.bounds = (min, max.max(min));
        self.current = self.current.clamp(self.bounds.0, self.bounds.1);
        self
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    fn adjust(&mut self) {
        let total: Duration = self.recent.iter().sum();
        let avg = total.as_secs_f64() / self.recent.len() as f64;
        let target = self.target.as_secs_f64();
        let (min, max) = self.bounds;

        let next = if avg < target * (1.0 - self.threshold) {
            self.current.saturating_add(1).min(max)
        } else if avg > target * (1.0 + self.threshold) {
            self.current.saturating_sub(1).max(min)
        } else {
            self.current
        };

        if next != self.current {
            debug!(
                "retarget: avg {:.3}s vs target {:.3}s, difficulty {} -> {}",
                avg, target, self.current, next
            );
            self.current = next;
        }
        self.recent.clear();
    }
}

impl DifficultyPolicy for Retarget {
    fn next_difficulty(&mut self, _index: u64) -> u32 {
        self.current
    }

    fn observe(&mut self, report: &BlockReport) {
        self.recent.push_back(report.duration);
        if self.recent.len() >= self.window {
            self.adjust();
        }
    }
}
