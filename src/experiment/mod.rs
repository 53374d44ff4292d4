//! Parameter-sweep experiments over a step-driven simulation.
//!
//! A simulation exposes three operations ([`Simulation`]): reset itself
//! for a new run, advance one step, and say whether it should stop. An
//! [`Experiment`] wraps it with
//!
//! - parameters, each a setter plus a fixed value or a list of levels,
//! - outputs, each a getter plus a printf-style column format,
//!
//! and runs the full-factorial [`Design`] over the swept parameters. Every
//! job is repeated `job_repetitions` times; the per-job mean and population
//! standard deviation of every output are reported to a [`ReportSink`] and
//! returned in an [`ExperimentReport`].
//!
//! # Lifecycle
//!
//! `Uninitialized -> DefaultsApplied -> DesignBuilt -> Running -> Summarizing -> Closed`
//!
//! Configuration and design errors stop the run before any report output.
//! A [`SimulationError`] stops the job loop; completed jobs are still
//! summarized.

mod config;
mod design;
mod format;
mod runner;
mod sink;
mod stats;
mod types;

pub use config::ExperimentConfig;
pub use design::{full_factorial_design, Design, Job};
pub use format::OutputFormat;
pub use runner::{
    Experiment, ExperimentReport, Getter, Phase, Setter, SummaryRow, SummaryTable,
};
pub use sink::{FileSink, MemorySink, NullSink, ReportSink};
pub use stats::{mean, population_std_dev, JobStatistics, OutputAccumulator, OutputStats};
pub use types::{Levels, ParamValue, Simulation, SimulationError};
