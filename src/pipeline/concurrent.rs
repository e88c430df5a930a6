//! Fan-out pipeline backed by the [`ExecutionEngine`].
//!
//! Every operation other than `to_slice`/`count` spawns one unit of work per element and
//! waits for all of them. Results are merged into state local to that one call, under a
//! mutex held only for the merge step itself. Consequences callers must account for:
//!
//! - `filter` and `map` produce elements in lock-acquisition order, not input order.
//! - `reduce` feeds elements to the combiner in arbitrary order, so the result is only
//!   well-defined for associative and commutative combiners.
//! - `any_match` / `all_match` never short-circuit; every unit runs.

use std::sync::{Arc, Mutex, PoisonError};

use crate::execution::{ExecutionEngine, Operation};
use crate::types::{BinaryOperator, Consumer, Element, Mapper, Predicate};

use super::Pipeline;

/// Pipeline that processes elements as independent, concurrently scheduled units of work.
///
/// Pipelines derived through `filter`/`map` share the receiver's engine.
#[derive(Debug, Clone)]
pub struct ConcurrentPipeline<T> {
    items: Vec<T>,
    engine: Arc<ExecutionEngine>,
}

impl<T> ConcurrentPipeline<T> {
    /// Wrap `items` with a default engine (rayon global pool, unbounded fan-out).
    pub fn new(items: Vec<T>) -> Self {
        Self::with_engine(items, Arc::new(ExecutionEngine::default()))
    }

    /// Wrap `items`, running units on `engine`.
    pub fn with_engine(items: Vec<T>, engine: Arc<ExecutionEngine>) -> Self {
        Self { items, engine }
    }

    /// The engine this pipeline (and everything derived from it) runs on.
    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    fn derive(&self, items: Vec<T>) -> Self {
        Self {
            items,
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<T: Element> ConcurrentPipeline<T> {
    fn fan_out<F>(&self, operation: Operation, unit: F)
    where
        F: Fn(&T) + Sync,
    {
        self.engine.fan_out(operation, &self.items, unit);
    }
}

/// Critical section: apply `f` to the shared merge target.
///
/// A poisoned lock means a sibling unit panicked; that panic is re-raised once the join
/// completes, so the merged state is discarded anyway.
fn merge<A>(target: &Mutex<A>, f: impl FnOnce(&mut A)) {
    let mut guard = target.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut *guard);
}

fn into_merged<A>(target: Mutex<A>) -> A {
    target.into_inner().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Element> Pipeline<T> for ConcurrentPipeline<T> {
    fn filter<P: Predicate<T>>(&self, predicate: P) -> Self {
        let kept: Mutex<Vec<T>> = Mutex::new(Vec::new());
        self.fan_out(Operation::Filter, |v| {
            if predicate(v) {
                merge(&kept, |kept| kept.push(v.clone()));
            }
        });
        self.derive(into_merged(kept))
    }

    fn map<M: Mapper<T>>(&self, mapper: M) -> Self {
        let mapped: Mutex<Vec<T>> = Mutex::new(Vec::with_capacity(self.items.len()));
        self.fan_out(Operation::Map, |v| {
            let out = mapper(v);
            merge(&mapped, |mapped| mapped.push(out));
        });
        self.derive(into_merged(mapped))
    }

    fn for_each<C: Consumer<T>>(&self, consumer: C) {
        self.fan_out(Operation::ForEach, |v| consumer(v));
    }

    fn reduce<B: BinaryOperator<T>>(&self, combiner: B) -> T {
        let acc = Mutex::new(T::default());
        self.fan_out(Operation::Reduce, |v| {
            merge(&acc, |acc| *acc = combiner(&*acc, v));
        });
        into_merged(acc)
    }

    fn to_slice(&self) -> &[T] {
        &self.items
    }

    fn any_match<P: Predicate<T>>(&self, predicate: P) -> bool {
        let found = Mutex::new(false);
        self.fan_out(Operation::AnyMatch, |v| {
            if predicate(v) {
                merge(&found, |found| *found = true);
            }
        });
        into_merged(found)
    }

    fn all_match<P: Predicate<T>>(&self, predicate: P) -> bool {
        let all = Mutex::new(true);
        self.fan_out(Operation::AllMatch, |v| {
            if !predicate(v) {
                merge(&all, |all| *all = false);
            }
        });
        !self.items.is_empty() && into_merged(all)
    }

    fn into_vec(self) -> Vec<T> {
        self.items
    }
}
