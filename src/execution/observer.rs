use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// The pipeline operation that triggered a fan-out run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ForEach,
    Filter,
    Map,
    Reduce,
    AnyMatch,
    AllMatch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ForEach => "for_each",
            Self::Filter => "filter",
            Self::Map => "map",
            Self::Reduce => "reduce",
            Self::AnyMatch => "any_match",
            Self::AllMatch => "all_match",
        };
        f.write_str(name)
    }
}

/// Execution events emitted by the engine.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted { operation: Operation, units: usize },
    ThrottleWaited { duration: Duration },
    UnitStarted { index: usize },
    UnitFinished { index: usize },
    RunFinished {
        operation: Operation,
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

/// Observer hook for execution events.
///
/// Unit events arrive concurrently from worker threads.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// A simple stderr logger for execution events.
#[derive(Debug, Default)]
pub struct StdErrExecutionObserver;

impl ExecutionObserver for StdErrExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::RunStarted { operation, units } => {
                eprintln!("[stream][{operation}] started units={units}");
            }
            ExecutionEvent::RunFinished {
                operation,
                elapsed,
                metrics,
            } => {
                eprintln!("[stream][{operation}] finished elapsed={elapsed:?} {metrics}");
            }
            other => eprintln!("[stream] {other:?}"),
        }
    }
}

/// An observer that forwards every event to a list of observers.
#[derive(Default)]
pub struct CompositeExecutionObserver {
    observers: Vec<Arc<dyn ExecutionObserver>>,
}

impl CompositeExecutionObserver {
    pub fn new(observers: Vec<Arc<dyn ExecutionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeExecutionObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeExecutionObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ExecutionObserver for CompositeExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Engine-wide execution metrics.
///
/// Each fan-out run counts its units in counters of its own and publishes a snapshot here
/// when it finishes, so nested or overlapping runs on one engine never clobber each other.
/// [`Self::active_units`] is a live gauge across every run currently in progress.
pub struct ExecutionMetrics {
    runs_started: AtomicU64,
    runs_finished: AtomicU64,
    active_units: AtomicUsize,
    last_run: Mutex<Option<ExecutionMetricsSnapshot>>,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_finished: AtomicU64::new(0),
            active_units: AtomicUsize::new(0),
            last_run: Mutex::new(None),
        }
    }

    /// Allocate a run id and fresh counters for one fan-out.
    pub(crate) fn begin_run(&self) -> RunMetrics {
        let run_id = self.runs_started.fetch_add(1, Ordering::SeqCst) + 1;
        RunMetrics::new(run_id)
    }

    /// Publish a finished run and return its snapshot.
    pub(crate) fn end_run(
        &self,
        run: &RunMetrics,
        elapsed: Duration,
    ) -> ExecutionMetricsSnapshot {
        let snap = run.snapshot(elapsed);
        let _ = self.runs_finished.fetch_add(1, Ordering::SeqCst);
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(snap.clone());
        snap
    }

    /// Mark a unit of `run` as executing until the returned guard is dropped.
    pub(crate) fn enter_unit<'a>(&'a self, run: &'a RunMetrics) -> ActiveUnit<'a> {
        let _ = self.active_units.fetch_add(1, Ordering::SeqCst);
        run.on_unit_start();
        ActiveUnit { metrics: self, run }
    }

    /// Units executing right now, across all runs on this engine.
    pub fn active_units(&self) -> usize {
        self.active_units.load(Ordering::SeqCst)
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::SeqCst)
    }

    pub fn runs_finished(&self) -> u64 {
        self.runs_finished.load(Ordering::SeqCst)
    }

    /// Snapshot of the most recently finished run (all zeros before the first one).
    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        self.last_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters owned by a single fan-out run.
pub(crate) struct RunMetrics {
    run_id: u64,
    units_started: AtomicU64,
    units_finished: AtomicU64,
    active_units: AtomicUsize,
    max_active_units: AtomicUsize,
    throttle_wait_ns: AtomicU64,
}

impl RunMetrics {
    fn new(run_id: u64) -> Self {
        Self {
            run_id,
            units_started: AtomicU64::new(0),
            units_finished: AtomicU64::new(0),
            active_units: AtomicUsize::new(0),
            max_active_units: AtomicUsize::new(0),
            throttle_wait_ns: AtomicU64::new(0),
        }
    }

    pub(crate) fn on_throttle_wait(&self, d: Duration) {
        let add = d.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.throttle_wait_ns.fetch_add(add, Ordering::SeqCst);
    }

    fn on_unit_start(&self) {
        let _ = self.units_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_units.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_active_units.fetch_max(now, Ordering::SeqCst);
    }

    fn on_unit_end(&self) {
        let _ = self.units_finished.fetch_add(1, Ordering::SeqCst);
        saturating_decrement(&self.active_units);
    }

    fn snapshot(&self, elapsed: Duration) -> ExecutionMetricsSnapshot {
        ExecutionMetricsSnapshot {
            run_id: self.run_id,
            elapsed: Some(elapsed),
            units_started: self.units_started.load(Ordering::SeqCst),
            units_finished: self.units_finished.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_units: self.max_active_units.load(Ordering::SeqCst),
        }
    }
}

/// Keeps a unit counted as active; releases both gauges on drop, including during unwinding.
pub(crate) struct ActiveUnit<'a> {
    metrics: &'a ExecutionMetrics,
    run: &'a RunMetrics,
}

impl Drop for ActiveUnit<'_> {
    fn drop(&mut self) {
        self.run.on_unit_end();
        saturating_decrement(&self.metrics.active_units);
    }
}

fn saturating_decrement(gauge: &AtomicUsize) {
    let _ = gauge.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
}

/// Summary of one finished fan-out run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub units_started: u64,
    pub units_finished: u64,
    pub throttle_wait: Duration,
    pub max_active_units: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, units={}/{}, max_active_units={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.units_finished,
            self.units_started,
            self.max_active_units,
            self.throttle_wait,
            self.elapsed
        )
    }
}
