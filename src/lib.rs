//! `rust-data-stream` provides chainable filter/map/reduce pipelines over an in-memory
//! sequence, with two interchangeable execution strategies behind one [`pipeline::Pipeline`]
//! trait.
//!
//! The primary entrypoint is [`factory::create`], which wraps a `Vec<T>` in a pipeline of the
//! requested [`factory::Mode`].
//!
//! ## Execution strategies
//!
//! - **Sequential** ([`pipeline::SequentialPipeline`]): runs on the calling thread and
//!   preserves input order end-to-end. `any_match`/`all_match` short-circuit.
//! - **Concurrent** ([`pipeline::ConcurrentPipeline`]): runs one unit of work per element on
//!   rayon and blocks until all have finished. Results are merged under a mutex, so
//!   `filter`/`map` output order is unspecified, `reduce` needs an associative and commutative
//!   combiner, and `any_match`/`all_match` always evaluate every element.
//!
//! Both strategies share these rules:
//!
//! - `filter`/`map` return a new pipeline of the same strategy; the receiver is never mutated.
//! - `reduce` folds from `T::default()` and returns it for an empty pipeline.
//! - `any_match` **and** `all_match` return `false` for an empty pipeline.
//! - Pipeline operations never return errors. A panic inside a caller-supplied function
//!   aborts the whole operation (for the concurrent strategy, after every sibling unit ran).
//!
//! ## Quick example
//!
//! ```rust
//! use rust_data_stream::factory::{create, Mode};
//! use rust_data_stream::pipeline::Pipeline;
//!
//! for mode in [Mode::Sequential, Mode::Concurrent] {
//!     let p = create(vec![1_i64, 2, 3, 4, 5], mode);
//!
//!     let doubled = p.map(|v: &i64| v * 2);
//!     let mut values = doubled.to_slice().to_vec();
//!     values.sort();
//!     assert_eq!(values, vec![2, 4, 6, 8, 10]);
//!
//!     assert_eq!(p.filter(|v: &i64| v % 2 == 0).count(), 2);
//!     assert_eq!(p.reduce(|acc: &i64, v: &i64| acc + v), 15);
//!     assert!(p.any_match(|v: &i64| *v == 3));
//!     assert!(!p.all_match(|v: &i64| *v > 1));
//! }
//! ```
//!
//! ## Configuring concurrent execution
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rust_data_stream::execution::{ExecutionEngine, ExecutionOptions, StdErrExecutionObserver};
//! use rust_data_stream::factory::{create_with_engine, Mode};
//! use rust_data_stream::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), rust_data_stream::PipelineError> {
//! let engine = ExecutionEngine::new(ExecutionOptions {
//!     num_threads: Some(4),
//!     max_in_flight: Some(16),
//! })?
//! .with_observer(Arc::new(StdErrExecutionObserver));
//! let metrics = engine.metrics();
//!
//! let p = create_with_engine((0..100_i64).collect(), Mode::Concurrent, Arc::new(engine));
//! assert_eq!(p.map(|v: &i64| v + 1).count(), 100);
//! assert_eq!(metrics.snapshot().units_finished, 100);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`factory`]: mode selection and pipeline construction
//! - [`pipeline`]: the [`pipeline::Pipeline`] trait and both strategies
//! - [`execution`]: the fan-out engine, options, metrics and observers
//! - [`types`]: function-shape contracts used as operation parameters
//! - [`error`]: error types used by construction and configuration

pub mod error;
pub mod execution;
pub mod factory;
pub mod pipeline;
pub mod types;

pub use error::{PipelineError, PipelineResult};
pub use factory::{create, create_from_tag, AnyPipeline, Mode};
pub use pipeline::Pipeline;
