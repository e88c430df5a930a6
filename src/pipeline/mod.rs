//! Chainable pipelines over an in-memory sequence.
//!
//! [`Pipeline`] is the capability set shared by both execution strategies:
//!
//! - [`SequentialPipeline`]: single-threaded, input order preserved end-to-end
//! - [`ConcurrentPipeline`]: one unit of work per element, merged under a lock
//!
//! Transformations (`filter`, `map`) never touch the receiver; they return a new pipeline of
//! the same strategy. Everything else is terminal.
//!
//! ## Example
//!
//! ```rust
//! use rust_data_stream::pipeline::{Pipeline, SequentialPipeline};
//!
//! let p = SequentialPipeline::new(vec![1_i64, 2, 3, 4, 5]);
//! let odd_squares = p.filter(|v: &i64| v % 2 == 1).map(|v: &i64| v * v);
//!
//! assert_eq!(odd_squares.to_slice(), &[1, 9, 25]);
//! assert_eq!(odd_squares.reduce(|acc: &i64, v: &i64| acc + v), 35);
//! assert_eq!(p.count(), 5);
//! ```

mod concurrent;
mod sequential;

use crate::types::{BinaryOperator, Consumer, Element, Mapper, Predicate};

pub use concurrent::ConcurrentPipeline;
pub use sequential::SequentialPipeline;

/// Operations every pipeline variant supports.
pub trait Pipeline<T: Element>: Sized {
    /// New pipeline holding the elements for which `predicate` holds.
    fn filter<P: Predicate<T>>(&self, predicate: P) -> Self;

    /// New pipeline holding `mapper` applied to every element. Length is unchanged.
    fn map<M: Mapper<T>>(&self, mapper: M) -> Self;

    /// Invoke `consumer` once per element.
    fn for_each<C: Consumer<T>>(&self, consumer: C);

    /// Fold every element into an accumulator starting from `T::default()`.
    ///
    /// Returns `T::default()` when the pipeline is empty.
    fn reduce<B: BinaryOperator<T>>(&self, combiner: B) -> T;

    /// The current elements.
    fn to_slice(&self) -> &[T];

    /// Number of current elements.
    fn count(&self) -> usize {
        self.to_slice().len()
    }

    /// `true` if at least one element satisfies `predicate`; `false` when empty.
    fn any_match<P: Predicate<T>>(&self, predicate: P) -> bool;

    /// `true` if every element satisfies `predicate`.
    ///
    /// An empty pipeline returns `false`, unlike [`Iterator::all`].
    fn all_match<P: Predicate<T>>(&self, predicate: P) -> bool;

    /// Consume the pipeline and return its elements.
    fn into_vec(self) -> Vec<T>;
}
