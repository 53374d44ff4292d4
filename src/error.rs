//! Error types shared by the annealer and the experiment driver.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation, configuration and reporting errors.
///
/// Errors raised by caller-supplied callbacks are not folded into this
/// enum: the annealer hands them back through [`AnnealError`](crate::sa::AnnealError)
/// and the experiment driver through
/// [`SimulationError`](crate::experiment::SimulationError). The one
/// exception is a default setter failing before the first job, which
/// aborts the run like a configuration error.
#[derive(Error, Debug)]
pub enum Error {
    /// A swept parameter uses the name reserved for the job id column.
    #[error("parameter `{name}` collides with the job id column `{job_id_name}`")]
    JobIdCollision {
        /// Offending parameter name.
        name: String,
        /// Reserved job id column name.
        job_id_name: String,
    },

    /// A parameter handed to the design generator is a fixed value.
    #[error("parameter `{name}` must provide a list of values")]
    NotAList {
        /// Offending parameter name.
        name: String,
    },

    /// A parameter value list is empty.
    #[error("parameter `{name}` has an empty value list")]
    EmptyLevels {
        /// Offending parameter name.
        name: String,
    },

    /// The design generator was called without any dimension.
    #[error("a full-factorial design needs at least one parameter")]
    NoParameters,

    /// Malformed annealing schedule.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Malformed annealer or experiment configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Output format string that cannot be parsed.
    #[error("invalid output format `{format}`: {reason}")]
    InvalidFormat {
        /// The format string as registered.
        format: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A fixed parameter's setter failed while defaults were applied.
    #[error("default for parameter `{name}` could not be applied")]
    DefaultFailed {
        /// Offending parameter name.
        name: String,
        /// The setter's error.
        source: crate::experiment::SimulationError,
    },

    /// Report sink failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for the design validation family
    /// (collision, non-list value set, empty value list, no parameters).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::JobIdCollision { .. }
                | Error::NotAList { .. }
                | Error::EmptyLevels { .. }
                | Error::NoParameters
        )
    }
}
