use thiserror::Error;

/// Convenience result type for pipeline construction and configuration.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned when building pipelines or execution engines.
///
/// Pipeline operations themselves never return errors; every variant here describes a
/// configuration problem detected before any element is processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The execution-mode tag is not one of the supported modes.
    #[error("unknown execution mode '{tag}' (expected 'sequential' or 'concurrent')")]
    UnknownMode { tag: String },

    /// [`crate::execution::ExecutionOptions`] contain an invalid value.
    #[error("invalid execution options: {message}")]
    InvalidOptions { message: String },

    /// A dedicated rayon thread pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A JSON pipeline configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
