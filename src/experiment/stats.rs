//! Per-job summary statistics.
//!
//! Outputs are accumulated online with `u-numflow`'s Welford accumulator,
//! one per output variable, so a job never buffers its repetitions.

use super::types::ParamValue;
use indexmap::IndexMap;
use u_numflow::stats::WelfordAccumulator;

pub use u_numflow::stats::{mean, population_std_dev};

/// Mean and population standard deviation of one output variable.
///
/// Both are NaN when any repetition produced a non-finite value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl OutputStats {
    /// `None` for an empty slice.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut acc = OutputAccumulator::new();
        for &value in samples {
            acc.update(value);
        }
        acc.finish()
    }

    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.std_dev.is_finite()
    }
}

/// Running statistics of one output over a job's repetitions.
#[derive(Debug, Clone, Default)]
pub struct OutputAccumulator {
    welford: WelfordAccumulator,
    non_finite: u64,
}

impl OutputAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one repetition's value. Non-finite values are counted apart.
    pub fn update(&mut self, value: f64) {
        if value.is_finite() {
            self.welford.update(value);
        } else {
            self.non_finite += 1;
        }
    }

    /// Number of values seen, finite or not.
    pub fn count(&self) -> u64 {
        self.welford.count() + self.non_finite
    }

    pub fn non_finite(&self) -> u64 {
        self.non_finite
    }

    /// `None` before the first value.
    pub fn finish(&self) -> Option<OutputStats> {
        if self.non_finite > 0 {
            return Some(OutputStats {
                mean: f64::NAN,
                std_dev: f64::NAN,
            });
        }
        Some(OutputStats {
            mean: self.welford.mean()?,
            std_dev: self.welford.population_std_dev()?,
        })
    }
}

/// Statistics of one job over all of its repetitions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobStatistics {
    pub job_id: usize,

    /// Values returned by the parameter setters when the job was applied.
    pub parameters: IndexMap<String, ParamValue>,

    /// Repetitions that ran, whether or not any output was registered.
    pub repetitions: usize,

    /// Per output variable, in registration order.
    pub outputs: IndexMap<String, OutputStats>,
}

impl JobStatistics {
    /// Reduces per-output accumulators to statistics. Variables that never
    /// received a value are left out.
    pub fn from_accumulators(
        job_id: usize,
        parameters: IndexMap<String, ParamValue>,
        repetitions: usize,
        accumulators: &IndexMap<String, OutputAccumulator>,
    ) -> Self {
        let outputs = accumulators
            .iter()
            .filter_map(|(name, acc)| acc.finish().map(|stats| (name.clone(), stats)))
            .collect();
        Self {
            job_id,
            parameters,
            repetitions,
            outputs,
        }
    }

    /// Same as [`from_accumulators`](Self::from_accumulators) over buffered
    /// samples.
    pub fn from_samples(
        job_id: usize,
        parameters: IndexMap<String, ParamValue>,
        repetitions: usize,
        samples: &IndexMap<String, Vec<f64>>,
    ) -> Self {
        let accumulators: IndexMap<String, OutputAccumulator> = samples
            .iter()
            .map(|(name, values)| {
                let mut acc = OutputAccumulator::new();
                values.iter().for_each(|&v| acc.update(v));
                (name.clone(), acc)
            })
            .collect();
        Self::from_accumulators(job_id, parameters, repetitions, &accumulators)
    }

    pub fn mean(&self, output: &str) -> Option<f64> {
        self.outputs.get(output).map(|s| s.mean)
    }

    pub fn std_dev(&self, output: &str) -> Option<f64> {
        self.outputs.get(output).map(|s| s.std_dev)
    }
}
