use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "pow_chain::report";

/// Timing record for one appended block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReport {
    pub block_index: u64,
    pub difficulty: u32,
    pub duration: Duration,
    pub attempts: u64,
    pub workers: usize,
    pub recorded_at: DateTime<Utc>,
}

impl BlockReport {
    pub fn new(
        block_index: u64,
        difficulty: u32,
        duration: Duration,
        attempts: u64,
        workers: usize,
    ) -> Self {
        Self {
            block_index,
            difficulty,
            duration,
            attempts,
            workers,
            recorded_at: Utc::now(),
        }
    }
}

/// Receives block timings. Reporting is best-effort: implementations deal
/// with their own failures and never hand them back to the miner. A panic
/// inside `record` is caught by the chain and logged.
pub trait ReportSink: Send {
    fn record(&self, report: &BlockReport);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn record(&self, _report: &BlockReport) {}
}

/// Writes each report to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn record(&self, report: &BlockReport) {
        info!(
            target: LOG_TARGET,
            "block #{} difficulty={} took {:.6}s ({} hashes, {} workers)",
            report.block_index,
            report.difficulty,
            report.duration.as_secs_f64(),
            report.attempts,
            report.workers
        );
    }
}

/// Keeps reports in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<BlockReport>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn reports(&self) -> Vec<BlockReport> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<BlockReport> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BlockReport>> {
        // A panicked writer cannot leave a half-pushed report behind.
        self.reports.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReportSink for MemorySink {
    fn record(&self, report: &BlockReport) {
        self.lock().push(report.clone());
    }
}

/// Appends one JSON object per line to a writer, for offline analysis.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> ReportSink for JsonLinesSink<W> {
    fn record(&self, report: &BlockReport) {
        let line = match serde_json::to_string(report) {
            Ok(line) => line,
            Err(e) => {
                warn!(target: LOG_TARGET, "dropping report for block #{}: {}", report.block_index, e);
                return;
            }
        };
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!(target: LOG_TARGET, "dropping report for block #{}: {}", report.block_index, e);
        }
    }
}

/// Forwards every report to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: ReportSink, B: ReportSink> ReportSink for Tee<A, B> {
    fn record(&self, report: &BlockReport) {
        self.0.record(report);
        self.1.record(report);
    }
}
