//! # Operation Metrics (PerformanceManager)
//!
//! In-process counters and timers per protocol operation, held in atomics
//! behind a clonable handle. When enabled, every observation is also
//! emitted through the `metrics` facade so whatever recorder the host
//! installs receives it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Metric name for operation counts.
pub const OPERATIONS_TOTAL: &str = "certproof_operations_total";
/// Metric name for operation failures.
pub const OPERATION_FAILURES_TOTAL: &str = "certproof_operation_failures_total";
/// Metric name for operation latency in seconds.
pub const OPERATION_SECONDS: &str = "certproof_operation_duration_seconds";

/// Operations the roles instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Issue,
    Store,
    Present,
    Verify,
    Revoke,
    Persist,
}

impl Operation {
    /// Every operation, in report order.
    pub const ALL: [Operation; 6] = [
        Self::Issue,
        Self::Store,
        Self::Present,
        Self::Verify,
        Self::Revoke,
        Self::Persist,
    ];

    /// Label value used in metric names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Store => "store",
            Self::Present => "present",
            Self::Verify => "verify",
            Self::Revoke => "revoke",
            Self::Persist => "persist",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct OperationCounters {
    count: AtomicU64,
    failures: AtomicU64,
    total_micros: AtomicU64,
    max_micros: AtomicU64,
}

/// Point-in-time view of one operation's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: Operation,
    pub count: u64,
    pub failures: u64,
    pub total_micros: u64,
    pub max_micros: u64,
}

impl OperationReport {
    /// Mean latency in microseconds, zero before the first observation.
    pub fn mean_micros(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_micros / self.count
        }
    }
}

/// Shared operation counters.
#[derive(Debug, Clone)]
pub struct PerformanceManager {
    counters: Arc<[OperationCounters; 6]>,
    emit: bool,
}

impl Default for PerformanceManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PerformanceManager {
    /// New counters; `emit` controls mirroring to the `metrics` facade.
    pub fn new(emit: bool) -> Self {
        Self {
            counters: Arc::new(Default::default()),
            emit,
        }
    }

    /// Record one observation.
    pub fn record(&self, operation: Operation, elapsed: Duration, ok: bool) {
        let c = &self.counters[operation.slot()];
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        c.count.fetch_add(1, Ordering::Relaxed);
        c.total_micros.fetch_add(micros, Ordering::Relaxed);
        c.max_micros.fetch_max(micros, Ordering::Relaxed);
        if !ok {
            c.failures.fetch_add(1, Ordering::Relaxed);
        }
        if self.emit {
            let op = operation.as_str();
            metrics::counter!(OPERATIONS_TOTAL, "operation" => op).increment(1);
            if !ok {
                metrics::counter!(OPERATION_FAILURES_TOTAL, "operation" => op).increment(1);
            }
            metrics::histogram!(OPERATION_SECONDS, "operation" => op).record(elapsed.as_secs_f64());
        }
    }

    /// Run `f`, recording its duration and whether it returned `Ok`.
    pub fn time<T, E>(&self, operation: Operation, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let start = Instant::now();
        let result = f();
        self.record(operation, start.elapsed(), result.is_ok());
        result
    }

    /// Counters for one operation.
    pub fn report(&self, operation: Operation) -> OperationReport {
        let c = &self.counters[operation.slot()];
        OperationReport {
            operation,
            count: c.count.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            total_micros: c.total_micros.load(Ordering::Relaxed),
            max_micros: c.max_micros.load(Ordering::Relaxed),
        }
    }

    /// Counters for every operation.
    pub fn snapshot(&self) -> Vec<OperationReport> {
        Operation::ALL.iter().map(|op| self.report(*op)).collect()
    }
}
