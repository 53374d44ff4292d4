//! Explicit annealing schedules.

use crate::error::{Error, Result};

/// A sequence of annealing stages.
///
/// Stage `s` runs `durations[s]` iterations at `temperatures[s]`. Both
/// sequences always have the same length.
///
/// # Examples
///
/// ```
/// use u_simlab::sa::Schedule;
///
/// let schedule = Schedule::new(vec![10.0, 5.0, 1.0], vec![100, 100, 200]).unwrap();
/// assert_eq!(schedule.len(), 3);
/// assert_eq!(schedule.total_iterations(), 400);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schedule {
    temperatures: Vec<f64>,
    durations: Vec<usize>,
}

impl Schedule {
    /// Builds a schedule from parallel temperature and duration lists.
    ///
    /// Temperatures must be finite and non-negative, durations positive.
    pub fn new(temperatures: Vec<f64>, durations: Vec<usize>) -> Result<Self> {
        let schedule = Self {
            temperatures,
            durations,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Builds a linear schedule.
    ///
    /// Durations step down from `max_time` in decrements of `time_step`,
    /// stopping before reaching `min_time`. Temperatures, one per
    /// duration, rise from `min_temp` in steps of
    /// `(max_temp - min_temp) / len`, so the first entry equals
    /// `min_temp` and the last stays one step short of `max_temp`.
    ///
    /// Fails when `time_step` is zero or `max_time <= min_time`.
    ///
    /// ```
    /// use u_simlab::sa::Schedule;
    ///
    /// let schedule = Schedule::linear(0.0, 10.0, 0, 10, 2).unwrap();
    /// assert_eq!(schedule.durations(), &[10, 8, 6, 4, 2]);
    /// assert_eq!(schedule.temperatures(), &[0.0, 2.0, 4.0, 6.0, 8.0]);
    /// ```
    pub fn linear(
        min_temp: f64,
        max_temp: f64,
        min_time: usize,
        max_time: usize,
        time_step: usize,
    ) -> Result<Self> {
        if time_step == 0 {
            return Err(Error::InvalidSchedule("time_step must be positive".into()));
        }

        let mut durations = Vec::new();
        let mut time = max_time;
        while time > min_time {
            durations.push(time);
            match time.checked_sub(time_step) {
                Some(next) => time = next,
                None => break,
            }
        }
        if durations.is_empty() {
            return Err(Error::InvalidSchedule(format!(
                "max_time ({max_time}) must exceed min_time ({min_time})"
            )));
        }

        let temp_step = (max_temp - min_temp) / durations.len() as f64;
        let temperatures = (0..durations.len())
            .map(|i| min_temp + temp_step * i as f64)
            .collect();

        Self::new(temperatures, durations)
    }

    /// Checks the structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.temperatures.len() != self.durations.len() {
            return Err(Error::InvalidSchedule(format!(
                "{} temperatures but {} durations",
                self.temperatures.len(),
                self.durations.len()
            )));
        }
        if let Some((stage, t)) = self
            .temperatures
            .iter()
            .enumerate()
            .find(|(_, t)| !t.is_finite() || **t < 0.0)
        {
            return Err(Error::InvalidSchedule(format!(
                "temperature at stage {stage} must be finite and non-negative, got {t}"
            )));
        }
        if let Some(stage) = self.durations.iter().position(|&d| d == 0) {
            return Err(Error::InvalidSchedule(format!(
                "duration at stage {stage} must be positive"
            )));
        }
        Ok(())
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn durations(&self) -> &[usize] {
        &self.durations
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Total number of candidate evaluations over all stages.
    pub fn total_iterations(&self) -> usize {
        self.durations.iter().sum()
    }

    /// Iterates `(temperature, duration)` pairs in stage order.
    pub fn stages(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        self.temperatures
            .iter()
            .copied()
            .zip(self.durations.iter().copied())
    }

    /// Splits the schedule back into its two lists.
    pub fn into_parts(self) -> (Vec<f64>, Vec<usize>) {
        (self.temperatures, self.durations)
    }
}
