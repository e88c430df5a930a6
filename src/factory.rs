//! Pipeline construction.
//!
//! Most callers should use [`create`], picking a [`Mode`] explicitly. When the mode comes from
//! outside the program (a CLI flag, an environment variable, a config file), use
//! [`create_from_tag`] or [`PipelineConfig`] so an unrecognized value is reported as a
//! [`PipelineError::UnknownMode`] instead of producing an unusable pipeline.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::execution::{ExecutionEngine, ExecutionOptions};
use crate::pipeline::{ConcurrentPipeline, Pipeline, SequentialPipeline};
use crate::types::{BinaryOperator, Consumer, Element, Mapper, Predicate};

/// Execution strategy of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Single-threaded, order preserving.
    #[default]
    Sequential,
    /// One unit of work per element, order not preserved.
    Concurrent,
}

impl FromStr for Mode {
    type Err = PipelineError;

    /// Parse a mode tag (case-insensitive). The numeric tags `1` and `2` are accepted too.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "sequential" | "1" => Ok(Self::Sequential),
            "concurrent" | "2" => Ok(Self::Concurrent),
            _ => Err(PipelineError::UnknownMode {
                tag: tag.to_string(),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Concurrent => f.write_str("concurrent"),
        }
    }
}

/// Mode plus execution options, loadable from JSON.
///
/// ```rust
/// use rust_data_stream::factory::{Mode, PipelineConfig};
///
/// let config = PipelineConfig::from_json_str(
///     r#"{ "mode": "concurrent", "execution": { "num_threads": 2, "max_in_flight": 8 } }"#,
/// )
/// .unwrap();
/// assert_eq!(config.mode, Mode::Concurrent);
/// assert_eq!(config.execution.max_in_flight, Some(8));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub mode: Mode,
    /// Only used by [`Mode::Concurrent`].
    pub execution: ExecutionOptions,
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.execution.validate()?;
        Ok(config)
    }
}

/// A pipeline whose strategy is chosen at runtime.
///
/// Chaining never crosses strategies: `filter`/`map` on either variant yield the same variant.
#[derive(Debug, Clone)]
pub enum AnyPipeline<T> {
    Sequential(SequentialPipeline<T>),
    Concurrent(ConcurrentPipeline<T>),
}

impl<T> AnyPipeline<T> {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Sequential(_) => Mode::Sequential,
            Self::Concurrent(_) => Mode::Concurrent,
        }
    }
}

impl<T: Element> Pipeline<T> for AnyPipeline<T> {
    fn filter<P: Predicate<T>>(&self, predicate: P) -> Self {
        match self {
            Self::Sequential(p) => Self::Sequential(p.filter(predicate)),
            Self::Concurrent(p) => Self::Concurrent(p.filter(predicate)),
        }
    }

    fn map<M: Mapper<T>>(&self, mapper: M) -> Self {
        match self {
            Self::Sequential(p) => Self::Sequential(p.map(mapper)),
            Self::Concurrent(p) => Self::Concurrent(p.map(mapper)),
        }
    }

    fn for_each<C: Consumer<T>>(&self, consumer: C) {
        match self {
            Self::Sequential(p) => p.for_each(consumer),
            Self::Concurrent(p) => p.for_each(consumer),
        }
    }

    fn reduce<B: BinaryOperator<T>>(&self, combiner: B) -> T {
        match self {
            Self::Sequential(p) => p.reduce(combiner),
            Self::Concurrent(p) => p.reduce(combiner),
        }
    }

    fn to_slice(&self) -> &[T] {
        match self {
            Self::Sequential(p) => p.to_slice(),
            Self::Concurrent(p) => p.to_slice(),
        }
    }

    fn any_match<P: Predicate<T>>(&self, predicate: P) -> bool {
        match self {
            Self::Sequential(p) => p.any_match(predicate),
            Self::Concurrent(p) => p.any_match(predicate),
        }
    }

    fn all_match<P: Predicate<T>>(&self, predicate: P) -> bool {
        match self {
            Self::Sequential(p) => p.all_match(predicate),
            Self::Concurrent(p) => p.all_match(predicate),
        }
    }

    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Sequential(p) => p.into_vec(),
            Self::Concurrent(p) => p.into_vec(),
        }
    }
}

/// Build a pipeline of the given mode over `items`.
///
/// `items` is moved in, not copied. Concurrent pipelines get a default engine (rayon global
/// pool, unbounded fan-out).
///
/// ```rust
/// use rust_data_stream::factory::{create, Mode};
/// use rust_data_stream::pipeline::Pipeline;
///
/// let p = create(vec![1_i64, 2, 3, 4], Mode::Concurrent);
/// assert_eq!(p.reduce(|acc: &i64, v: &i64| acc + v), 10);
/// ```
pub fn create<T>(items: Vec<T>, mode: Mode) -> AnyPipeline<T> {
    match mode {
        Mode::Sequential => AnyPipeline::Sequential(SequentialPipeline::new(items)),
        Mode::Concurrent => AnyPipeline::Concurrent(ConcurrentPipeline::new(items)),
    }
}

/// Like [`create`], but parses the mode from a string tag.
pub fn create_from_tag<T>(items: Vec<T>, tag: &str) -> PipelineResult<AnyPipeline<T>> {
    let mode: Mode = tag.parse()?;
    Ok(create(items, mode))
}

/// Like [`create`], but concurrent pipelines run on `engine`.
///
/// Sequential pipelines ignore the engine.
pub fn create_with_engine<T>(
    items: Vec<T>,
    mode: Mode,
    engine: Arc<ExecutionEngine>,
) -> AnyPipeline<T> {
    match mode {
        Mode::Sequential => AnyPipeline::Sequential(SequentialPipeline::new(items)),
        Mode::Concurrent => AnyPipeline::Concurrent(ConcurrentPipeline::with_engine(items, engine)),
    }
}

/// Build a pipeline from a [`PipelineConfig`].
///
/// For [`Mode::Concurrent`] this builds a new [`ExecutionEngine`] from `config.execution`.
pub fn create_with_config<T>(
    items: Vec<T>,
    config: &PipelineConfig,
) -> PipelineResult<AnyPipeline<T>> {
    match config.mode {
        Mode::Sequential => Ok(create(items, Mode::Sequential)),
        Mode::Concurrent => {
            let engine = ExecutionEngine::new(config.execution.clone())?;
            Ok(create_with_engine(items, Mode::Concurrent, Arc::new(engine)))
        }
    }
}
