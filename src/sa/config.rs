//! Annealer configuration.

use crate::error::{Error, Result};

/// Configuration for the annealer.
///
/// The schedule itself lives in [`Schedule`](super::Schedule); this holds
/// the knobs that are independent of it.
///
/// # Examples
///
/// ```
/// use u_simlab::sa::AnnealConfig;
///
/// let config = AnnealConfig::default()
///     .with_k(0.5)
///     .with_seed(42)
///     .with_history(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnealConfig {
    /// Acceptance scale. A worse candidate is accepted with probability
    /// `exp(-delta / (k * T))`, so larger values flatten the curve.
    pub k: f64,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,

    /// Record the best energy at the end of every stage.
    pub record_history: bool,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            k: 1.0,
            seed: None,
            record_history: false,
        }
    }
}

impl AnnealConfig {
    /// Sets the acceptance scale `k`.
    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables per-stage energy history.
    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.k.is_finite() || self.k <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "k must be positive and finite, got {}",
                self.k
            )));
        }
        Ok(())
    }
}
