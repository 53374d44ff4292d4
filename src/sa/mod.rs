//! Simulated Annealing (SA) over an explicit temperature schedule.
//!
//! A single-solution trajectory search. At every iteration a neighbor of
//! the current state is proposed; strictly better candidates are always
//! accepted, others with probability `exp(-delta / (k * T))`. The best
//! state seen over the whole run is returned.
//!
//! Unlike a cooling-rate driven annealer, the temperature here follows a
//! caller-given [`Schedule`]: a list of `(temperature, duration)` stages.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Metropolis et al. (1953), "Equation of State Calculations by Fast Computing Machines"

mod config;
mod runner;
mod schedule;
mod types;

pub use config::AnnealConfig;
pub use runner::{acceptance_probability, AnnealError, AnnealResult, Annealer};
pub use schedule::Schedule;
pub use types::{AnnealProblem, FnProblem};
