//! Execution engine behind [`crate::pipeline::ConcurrentPipeline`].
//!
//! The engine owns the fan-out/fan-in primitive: one unit of work per element, spawned into a
//! rayon scope, with the caller blocked until every unit has finished. On top of that it
//! provides:
//!
//! - Thread placement (rayon's global pool, or a dedicated pool of `num_threads` workers)
//! - An optional cap on concurrently executing units (`max_in_flight`)
//! - Real-time metrics + observer hooks for monitoring

mod observer;
mod semaphore;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

pub use observer::{
    CompositeExecutionObserver, ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot,
    ExecutionObserver, Operation, StdErrExecutionObserver,
};

use observer::RunMetrics;
use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
///
/// The default reproduces plain unbounded fan-out on rayon's global pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Number of worker threads in a dedicated pool.
    ///
    /// If `None`, units run on rayon's global pool.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently executing units of work.
    ///
    /// If `None`, every unit is eligible to run as soon as a worker is free.
    pub max_in_flight: Option<usize>,
}

impl ExecutionOptions {
    /// Check option values without building anything.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.num_threads == Some(0) {
            return Err(PipelineError::InvalidOptions {
                message: "num_threads must be > 0 when set".to_string(),
            });
        }
        if self.max_in_flight == Some(0) {
            return Err(PipelineError::InvalidOptions {
                message: "max_in_flight must be > 0 when set".to_string(),
            });
        }
        Ok(())
    }
}

/// Runs per-element units of work concurrently and joins on them.
///
/// One engine is shared (via [`Arc`]) by a concurrent pipeline and every pipeline derived
/// from it.
pub struct ExecutionEngine {
    pool: Option<ThreadPool>,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl ExecutionEngine {
    /// Create a new engine with the given options.
    ///
    /// Builds a dedicated thread pool when `opts.num_threads` is set.
    pub fn new(opts: ExecutionOptions) -> PipelineResult<Self> {
        opts.validate()?;

        let pool = opts
            .num_threads
            .map(|n| {
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("stream-worker-{i}"))
                    .build()
            })
            .transpose()?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Number of worker threads units are scheduled on.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Invoke `unit` once per element, concurrently, and return once all invocations finished.
    ///
    /// Each element becomes its own rayon task; no ordering between units is guaranteed.
    /// If a unit panics, the remaining units still run to completion and the panic then
    /// resumes on the calling thread.
    pub fn fan_out<T, F>(&self, operation: Operation, items: &[T], unit: F)
    where
        T: Sync,
        F: Fn(&T) + Sync,
    {
        match &self.pool {
            Some(pool) => pool.install(|| self.fan_out_impl(operation, items, &unit)),
            None => self.fan_out_impl(operation, items, &unit),
        }
    }

    fn fan_out_impl<T: Sync>(
        &self,
        operation: Operation,
        items: &[T],
        unit: &(dyn Fn(&T) + Sync),
    ) {
        let start = Instant::now();
        let run = self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            operation,
            units: items.len(),
        });

        let sem = self.opts.max_in_flight.map(Semaphore::new);

        rayon::scope(|s| {
            for (index, item) in items.iter().enumerate() {
                let (run, sem) = (&run, sem.as_ref());
                s.spawn(move |_| self.run_unit(index, item, run, sem, unit));
            }
        });

        let elapsed = start.elapsed();
        let metrics = self.metrics.end_run(&run, elapsed);
        self.emit(ExecutionEvent::RunFinished {
            operation,
            elapsed,
            metrics,
        });
    }

    fn run_unit<T>(
        &self,
        index: usize,
        item: &T,
        run: &RunMetrics,
        sem: Option<&Semaphore>,
        unit: &(dyn Fn(&T) + Sync),
    ) {
        let _permit = sem.map(|sem| {
            let permit = sem.acquire();
            let waited = permit.waited();
            if waited > Duration::ZERO {
                run.on_throttle_wait(waited);
                self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
            }
            permit
        });

        let _active = self.metrics.enter_unit(run);
        self.emit(ExecutionEvent::UnitStarted { index });

        unit(item);

        self.emit(ExecutionEvent::UnitFinished { index });
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

impl Default for ExecutionEngine {
    /// Unbounded fan-out on rayon's global pool, without an observer.
    fn default() -> Self {
        Self {
            pool: None,
            opts: ExecutionOptions::default(),
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        }
    }
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("opts", &self.opts)
            .field("dedicated_pool", &self.pool.is_some())
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ExecutionEngine, ExecutionOptions, Operation};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::PipelineError;
    use crate::execution::{ExecutionEvent, ExecutionObserver};

    fn engine(num_threads: usize, max_in_flight: Option<usize>) -> ExecutionEngine {
        ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(num_threads),
            max_in_flight,
        })
        .unwrap()
    }

    #[test]
    fn fan_out_runs_with_concurrency() {
        let items: Vec<u64> = (0..64).collect();
        let engine = engine(4, None);

        let active = AtomicUsize::new(0);
        let max_active = AtomicUsize::new(0);
        let seen = AtomicUsize::new(0);

        engine.fan_out(Operation::ForEach, &items, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_active.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            active.fetch_sub(1, Ordering::SeqCst);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(seen.load(Ordering::SeqCst), items.len());
        assert!(max_active.load(Ordering::SeqCst) > 1);
    }

    struct ConcurrencyObserver {
        active_units: AtomicUsize,
        max_active_units: AtomicUsize,
    }

    impl ConcurrencyObserver {
        fn new() -> Self {
            Self {
                active_units: AtomicUsize::new(0),
                max_active_units: AtomicUsize::new(0),
            }
        }
        fn max(&self) -> usize {
            self.max_active_units.load(Ordering::SeqCst)
        }
    }

    impl ExecutionObserver for ConcurrencyObserver {
        fn on_event(&self, event: &ExecutionEvent) {
            match event {
                ExecutionEvent::UnitStarted { .. } => {
                    let now = self.active_units.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_active_units.fetch_max(now, Ordering::SeqCst);
                }
                ExecutionEvent::UnitFinished { .. } => {
                    let _ = self.active_units.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn max_in_flight_throttles_unit_concurrency() {
        let items: Vec<u64> = (0..50).collect();
        let observer = Arc::new(ConcurrencyObserver::new());
        let obs_trait: Arc<dyn ExecutionObserver> = observer.clone();
        let engine = engine(4, Some(1)).with_observer(obs_trait);

        let seen = AtomicUsize::new(0);
        engine.fan_out(Operation::Map, &items, |_| {
            // Long enough to overlap if not throttled.
            std::thread::sleep(Duration::from_millis(1));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(seen.load(Ordering::SeqCst), items.len());
        assert_eq!(observer.max(), 1);
    }

    #[test]
    fn metrics_are_available_after_run() {
        let items: Vec<u64> = (0..30).collect();
        let engine = engine(4, Some(1));
        let metrics = engine.metrics();

        engine.fan_out(Operation::Filter, &items, |_| {
            std::thread::sleep(Duration::from_millis(2));
        });

        let snap = metrics.snapshot();
        assert_eq!(snap.run_id, 1);
        assert_eq!(snap.units_started, items.len() as u64);
        assert_eq!(snap.units_finished, items.len() as u64);
        assert_eq!(snap.max_active_units, 1);
        assert!(snap.throttle_wait > Duration::ZERO);
        assert!(snap.elapsed.is_some());
    }

    #[test]
    fn fan_out_over_nothing_returns_immediately() {
        let engine = ExecutionEngine::default();
        let calls = AtomicUsize::new(0);
        engine.fan_out(Operation::ForEach, &Vec::<u8>::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.metrics().snapshot().units_started, 0);
    }

    #[test]
    fn panicking_unit_propagates_after_siblings_finish() {
        let items: Vec<u64> = (0..20).collect();
        let engine = engine(2, Some(1));
        let finished = AtomicUsize::new(0);

        let result = catch_unwind(AssertUnwindSafe(|| {
            engine.fan_out(Operation::ForEach, &items, |v| {
                if *v == 7 {
                    panic!("unit 7 failed");
                }
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }));

        assert!(result.is_err());
        assert_eq!(finished.load(Ordering::SeqCst), items.len() - 1);
        assert_eq!(engine.metrics().active_units(), 0);
    }

    #[test]
    fn zero_sized_options_are_rejected() {
        let err = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(0),
            max_in_flight: None,
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOptions { .. }));

        let err = ExecutionEngine::new(ExecutionOptions {
            num_threads: None,
            max_in_flight: Some(0),
        })
        .unwrap_err();
        assert!(err.to_string().contains("max_in_flight must be > 0"));
    }

    #[test]
    fn dedicated_pool_uses_requested_thread_count() {
        assert_eq!(engine(3, None).num_threads(), 3);
    }
}
