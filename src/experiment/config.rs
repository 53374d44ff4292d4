//! Experiment configuration.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Configuration for an experiment run.
///
/// # Examples
///
/// ```
/// use u_simlab::experiment::ExperimentConfig;
///
/// let config = ExperimentConfig::new("queue-sweep")
///     .with_comments("Service rate against arrival rate")
///     .with_directory("results")
///     .with_job_repetitions(5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExperimentConfig {
    /// Experiment name. Part of the report file name.
    pub name: String,

    /// Free-form description written at the top of the report.
    pub comments: String,

    /// Directory receiving the report file.
    pub directory: PathBuf,

    /// Simulation repetitions per job.
    pub job_repetitions: usize,

    /// Name of the job id column. No parameter may use it.
    pub job_id_name: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed".to_string(),
            comments: String::new(),
            directory: PathBuf::from("../output/"),
            job_repetitions: 1,
            job_id_name: "job_id".to_string(),
        }
    }
}

impl ExperimentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn with_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = directory.as_ref().to_path_buf();
        self
    }

    pub fn with_job_repetitions(mut self, n: usize) -> Self {
        self.job_repetitions = n;
        self
    }

    pub fn with_job_id_name(mut self, name: impl Into<String>) -> Self {
        self.job_id_name = name.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("experiment name must not be empty".into()));
        }
        if self.job_repetitions == 0 {
            return Err(Error::InvalidConfig(
                "job_repetitions must be at least 1".into(),
            ));
        }
        if self.job_id_name.is_empty() {
            return Err(Error::InvalidConfig("job_id_name must not be empty".into()));
        }
        Ok(())
    }

    /// Report file for a run started at `timestamp`.
    pub fn report_path(&self, timestamp: &str) -> PathBuf {
        self.directory.join(format!("{} {}.csv", self.name, timestamp))
    }
}
