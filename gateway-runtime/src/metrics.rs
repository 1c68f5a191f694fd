//! Lightweight execution counters surfaced through the status endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::gateway::Operation;

/// Global counters using atomics.
///
/// All counters use relaxed ordering — they are approximate values read
/// on demand by the status endpoint, so strict ordering isn't needed.
pub struct ConsoleMetrics {
    /// Shell commands executed (including directory changes).
    pub shell_commands: AtomicU64,
    /// Python eval calls.
    pub eval_calls: AtomicU64,
    /// Uploaded-file runs.
    pub uploaded_runs: AtomicU64,
    /// Foreign-runtime runs.
    pub foreign_runs: AtomicU64,
    /// Calls that ended in a gateway-level error (any kind).
    pub failed_calls: AtomicU64,
    /// Denied authorization attempts.
    pub denied_calls: AtomicU64,
    /// Calls currently executing.
    pub in_flight: AtomicU64,
}

impl Default for ConsoleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleMetrics {
    pub const fn new() -> Self {
        Self {
            shell_commands: AtomicU64::new(0),
            eval_calls: AtomicU64::new(0),
            uploaded_runs: AtomicU64::new(0),
            foreign_runs: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            denied_calls: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
        }
    }

    pub fn record_call(&self, operation: Operation) {
        let counter = match operation {
            Operation::ShellCommand => &self.shell_commands,
            Operation::EvalCode => &self.eval_calls,
            Operation::RunUploadedFile => &self.uploaded_runs,
            Operation::RunForeignCode => &self.foreign_runs,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denied(&self) {
        self.denied_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a guard that keeps `in_flight` accurate even on early returns,
    /// panics, or task cancellation.
    pub fn in_flight_guard(&self) -> InFlightGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard(self)
    }

    /// Snapshot all counters as key-value pairs for the status endpoint.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        vec![
            (
                "shell_commands".into(),
                self.shell_commands.load(Ordering::Relaxed),
            ),
            ("eval_calls".into(), self.eval_calls.load(Ordering::Relaxed)),
            (
                "uploaded_runs".into(),
                self.uploaded_runs.load(Ordering::Relaxed),
            ),
            (
                "foreign_runs".into(),
                self.foreign_runs.load(Ordering::Relaxed),
            ),
            (
                "failed_calls".into(),
                self.failed_calls.load(Ordering::Relaxed),
            ),
            (
                "denied_calls".into(),
                self.denied_calls.load(Ordering::Relaxed),
            ),
            ("in_flight".into(), self.in_flight.load(Ordering::Relaxed)),
        ]
    }
}

/// RAII guard that decrements `in_flight` when dropped.
pub struct InFlightGuard<'a>(&'a ConsoleMetrics);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let _ = self
            .0
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }
}

/// Global metrics instance.
static METRICS: ConsoleMetrics = ConsoleMetrics::new();

/// Returns the global metrics tracker.
pub fn metrics() -> &'static ConsoleMetrics {
    &METRICS
}
