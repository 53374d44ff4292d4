//! Parameter values and the simulation callback contract.

use std::error::Error as StdError;
use std::fmt;

/// A single parameter value.
///
/// Experiments mix parameters of different kinds (population sizes,
/// rates, switches, labels), so values are carried as a small tagged
/// union rather than a type parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view: integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` keeps width/alignment flags working for report columns.
        match self {
            ParamValue::Bool(v) => f.pad(&v.to_string()),
            ParamValue::Int(v) => f.pad(&v.to_string()),
            // Debug keeps the trailing `.0` on whole floats.
            ParamValue::Float(v) => f.pad(&format!("{v:?}")),
            ParamValue::Text(v) => f.pad(v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v as f64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// The values registered for a parameter.
///
/// A [`Fixed`](Levels::Fixed) value, or a list with a single entry,
/// configures every job identically. A list of two or more values is
/// swept across jobs.
#[derive(Debug, Clone, PartialEq)]
pub enum Levels {
    Fixed(ParamValue),
    List(Vec<ParamValue>),
}

impl Levels {
    pub fn fixed(value: impl Into<ParamValue>) -> Self {
        Levels::Fixed(value.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Levels::List(values.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<ParamValue>> From<Vec<V>> for Levels {
    fn from(values: Vec<V>) -> Self {
        Levels::list(values)
    }
}

/// Error raised by a simulation callback.
///
/// Carries a message and, optionally, the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SimulationError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl SimulationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error with context.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Messages of this error and every nested cause, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.message.clone()];
        let mut cause = StdError::source(self);
        while let Some(err) = cause {
            messages.push(err.to_string());
            cause = err.source();
        }
        messages
    }
}

/// Lifecycle of a discrete-time-stepped simulation.
///
/// For each repetition the driver calls [`initiate`](Simulation::initiate)
/// once, then [`step`](Simulation::step) until
/// [`should_stop`](Simulation::should_stop) reports `true`.
///
/// There is no iteration bound: a simulation whose `should_stop` never
/// returns `true` hangs the experiment.
pub trait Simulation {
    /// Resets the simulation for a new repetition.
    fn initiate(&mut self) -> Result<(), SimulationError>;

    /// Advances the simulation by one time step.
    fn step(&mut self) -> Result<(), SimulationError>;

    /// Termination predicate, checked before every step.
    fn should_stop(&self) -> Result<bool, SimulationError>;
}
