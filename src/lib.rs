//! Simulation experiment toolkit.
//!
//! Two independent pieces:
//!
//! - **Simulated Annealing ([`sa`])**: minimizes a caller-defined energy
//!   over a caller-defined neighborhood, following an explicit
//!   `(temperature, duration)` schedule.
//! - **Experiments ([`experiment`])**: drives a step-based simulation over
//!   the full-factorial combination of parameter levels, repeats every job,
//!   and reports per-job means and standard deviations.
//!
//! Both are domain-agnostic: states, moves and simulations are supplied by
//! the caller. Randomness comes from `u-numflow`'s seeded RNG, logging goes
//! through `tracing`.

pub mod error;
pub mod experiment;
pub mod sa;

pub use error::{Error, Result};
