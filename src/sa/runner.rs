//! Annealing loop.

use super::config::AnnealConfig;
use super::schedule::Schedule;
use super::types::AnnealProblem;
use crate::error::Error;
use rand::Rng;
use tracing::debug;
use u_numflow::random::create_rng;

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub struct AnnealResult<S: Clone> {
    /// The best state found. An independent value, never shared with the
    /// search trajectory.
    pub best: S,

    /// Energy of the best state.
    pub best_energy: f64,

    /// Energy of the initial state.
    pub initial_energy: f64,

    /// Energy of the state the search ended on.
    pub final_energy: f64,

    /// Total number of candidate evaluations.
    pub iterations: usize,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: usize,

    /// Number of strictly improving moves.
    pub improving_moves: usize,

    /// Best energy at the end of each stage, when history is enabled.
    pub energy_history: Vec<f64>,
}

/// Failure of an annealing run.
#[derive(Debug, thiserror::Error)]
pub enum AnnealError<E> {
    /// The configuration or schedule was rejected before the run started.
    #[error(transparent)]
    Config(#[from] Error),

    /// The caller's move or energy function failed.
    #[error("annealing problem failed")]
    Problem(#[source] E),
}

/// Probability of accepting a candidate whose energy exceeds the current
/// one by `delta`.
///
/// A non-positive `delta` is always accepted. At zero temperature only
/// such moves are accepted.
///
/// ```
/// use u_simlab::sa::acceptance_probability;
///
/// assert_eq!(acceptance_probability(0.0, 1.0, 5.0), 1.0);
/// assert!((acceptance_probability(1.0, 1.0, 1.0) - (-1.0f64).exp()).abs() < 1e-15);
/// assert_eq!(acceptance_probability(1.0, 1.0, 0.0), 0.0);
/// ```
pub fn acceptance_probability(delta: f64, k: f64, temperature: f64) -> f64 {
    if delta <= 0.0 {
        1.0
    } else if temperature <= 0.0 {
        0.0
    } else {
        (-delta / (k * temperature)).exp()
    }
}

/// Executes Simulated Annealing over an explicit schedule.
pub struct Annealer;

impl Annealer {
    /// Runs annealing with an RNG seeded from `config.seed`.
    pub fn run<P: AnnealProblem>(
        problem: &P,
        initial: &P::State,
        schedule: &Schedule,
        config: &AnnealConfig,
    ) -> Result<AnnealResult<P::State>, AnnealError<P::Error>> {
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        Self::run_with_rng(problem, initial, schedule, config, &mut rng)
    }

    /// Runs annealing and returns only the best state.
    pub fn anneal<P: AnnealProblem>(
        problem: &P,
        initial: &P::State,
        schedule: &Schedule,
        config: &AnnealConfig,
    ) -> Result<P::State, AnnealError<P::Error>> {
        Self::run(problem, initial, schedule, config).map(|result| result.best)
    }

    /// Runs annealing with a caller-provided random source.
    ///
    /// The energy function is called exactly
    /// `schedule.total_iterations() + 1` times.
    pub fn run_with_rng<P: AnnealProblem, R: Rng>(
        problem: &P,
        initial: &P::State,
        schedule: &Schedule,
        config: &AnnealConfig,
        rng: &mut R,
    ) -> Result<AnnealResult<P::State>, AnnealError<P::Error>> {
        config.validate()?;
        schedule.validate()?;

        let initial_energy = problem.energy(initial).map_err(AnnealError::Problem)?;
        let mut best = initial.clone();
        let mut best_energy = initial_energy;
        let mut current = initial.clone();
        let mut current_energy = initial_energy;

        let mut iterations = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut energy_history = Vec::new();

        for (stage, (temperature, duration)) in schedule.stages().enumerate() {
            for _ in 0..duration {
                let candidate = problem
                    .neighbor(&current, rng)
                    .map_err(AnnealError::Problem)?;
                let candidate_energy = problem.energy(&candidate).map_err(AnnealError::Problem)?;
                iterations += 1;

                if candidate_energy < current_energy {
                    improving_moves += 1;
                    accepted_moves += 1;
                    if candidate_energy < best_energy {
                        best = candidate.clone();
                        best_energy = candidate_energy;
                    }
                    current = candidate;
                    current_energy = candidate_energy;
                } else {
                    // Equal energy falls through here with probability 1.
                    let probability = acceptance_probability(
                        candidate_energy - current_energy,
                        config.k,
                        temperature,
                    );
                    if rng.random::<f64>() < probability {
                        accepted_moves += 1;
                        current = candidate;
                        current_energy = candidate_energy;
                    }
                }
            }

            debug!(
                stage,
                temperature,
                duration,
                best_energy,
                current_energy,
                "annealing stage complete"
            );
            if config.record_history {
                energy_history.push(best_energy);
            }
        }

        Ok(AnnealResult {
            best,
            best_energy,
            initial_energy,
            final_energy: current_energy,
            iterations,
            accepted_moves,
            improving_moves,
            energy_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sa::FnProblem;
    use proptest::prelude::*;
    use rand::RngCore;
    use std::cell::Cell;
    use std::convert::Infallible;

    /// Always yields zero bits, so every uniform draw is 0.0.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    /// Always yields one bits, so every uniform draw is just below 1.0.
    struct OnesRng;

    impl RngCore for OnesRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }
        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(u8::MAX);
        }
    }

    // ---- Quadratic minimization: f(x) = x^2, minimum at 0 ----

    struct Quadratic;

    impl AnnealProblem for Quadratic {
        type State = f64;
        type Error = Infallible;

        fn neighbor<R: Rng>(&self, x: &f64, rng: &mut R) -> Result<f64, Infallible> {
            Ok(x + rng.random_range(-1.0..1.0))
        }

        fn energy(&self, x: &f64) -> Result<f64, Infallible> {
            Ok(x * x)
        }
    }

    // ---- Walk: each move adds `step`; energy is the position, or constant when flat ----

    struct Walk {
        step: i64,
        flat: bool,
        energy_calls: Cell<usize>,
    }

    impl Walk {
        fn new(step: i64, flat: bool) -> Self {
            Self {
                step,
                flat,
                energy_calls: Cell::new(0),
            }
        }
    }

    impl AnnealProblem for Walk {
        type State = i64;
        type Error = Infallible;

        fn neighbor<R: Rng>(&self, x: &i64, _rng: &mut R) -> Result<i64, Infallible> {
            Ok(x + self.step)
        }

        fn energy(&self, x: &i64) -> Result<f64, Infallible> {
            self.energy_calls.set(self.energy_calls.get() + 1);
            Ok(if self.flat { 7.0 } else { *x as f64 })
        }
    }

    fn schedule() -> Schedule {
        Schedule::new(vec![1.0, 0.5, 0.25], vec![4, 3, 5]).unwrap()
    }

    #[test]
    fn test_energy_call_count() {
        let problem = Walk::new(1, false);
        let config = AnnealConfig::default().with_seed(7);
        let result = Annealer::run(&problem, &0, &schedule(), &config).unwrap();

        assert_eq!(problem.energy_calls.get(), 12 + 1);
        assert_eq!(result.iterations, 12);
    }

    #[test]
    fn test_equal_energy_always_accepted() {
        let problem = Walk::new(1, true);
        let config = AnnealConfig::default();
        let result =
            Annealer::run_with_rng(&problem, &0, &schedule(), &config, &mut OnesRng).unwrap();

        // Draws are just below 1.0, yet every flat move goes through.
        assert_eq!(result.accepted_moves, result.iterations);
        assert_eq!(result.improving_moves, 0);
        // Not strictly better, so the best state stays the initial one.
        assert_eq!(result.best, 0);
    }

    #[test]
    fn test_equal_energy_with_zero_draw() {
        let problem = Walk::new(1, true);
        let config = AnnealConfig::default();
        let result =
            Annealer::run_with_rng(&problem, &0, &schedule(), &config, &mut ZeroRng).unwrap();
        assert_eq!(result.accepted_moves, 12);
    }

    #[test]
    fn test_uphill_rejected_by_high_draw() {
        let problem = Walk::new(1, false);
        let config = AnnealConfig::default();
        let result =
            Annealer::run_with_rng(&problem, &0, &schedule(), &config, &mut OnesRng).unwrap();

        assert_eq!(result.accepted_moves, 0);
        assert!((result.final_energy - 0.0).abs() < 1e-15);
    }

    #[test]
    fn test_uphill_accepted_by_zero_draw() {
        let problem = Walk::new(1, false);
        let config = AnnealConfig::default();
        let result =
            Annealer::run_with_rng(&problem, &0, &schedule(), &config, &mut ZeroRng).unwrap();

        assert_eq!(result.accepted_moves, 12);
        assert!((result.final_energy - 12.0).abs() < 1e-15);
        assert_eq!(result.best, 0);
    }

    #[test]
    fn test_downhill_tracks_best() {
        let problem = Walk::new(-2, false);
        let config = AnnealConfig::default();
        let result =
            Annealer::run_with_rng(&problem, &10, &schedule(), &config, &mut OnesRng).unwrap();

        assert_eq!(result.improving_moves, 12);
        assert_eq!(result.best, 10 - 24);
        assert!((result.best_energy + 14.0).abs() < 1e-15);
    }

    #[test]
    fn test_zero_temperature_rejects_uphill() {
        let problem = Walk::new(1, false);
        let schedule = Schedule::new(vec![0.0], vec![5]).unwrap();
        let config = AnnealConfig::default();
        let result =
            Annealer::run_with_rng(&problem, &0, &schedule, &config, &mut ZeroRng).unwrap();
        assert_eq!(result.accepted_moves, 0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let config = AnnealConfig::default().with_seed(42);
        let schedule = Schedule::linear(0.01, 10.0, 0, 500, 50).unwrap();
        let a = Annealer::run(&Quadratic, &8.0, &schedule, &config).unwrap();
        let b = Annealer::run(&Quadratic, &8.0, &schedule, &config).unwrap();

        assert_eq!(a.best.to_bits(), b.best.to_bits());
        assert_eq!(a.accepted_moves, b.accepted_moves);
        assert_eq!(a.improving_moves, b.improving_moves);
    }

    #[test]
    fn test_quadratic_converges() {
        let temperatures: Vec<f64> = (0..40).map(|i| 10.0 * 0.85f64.powi(i)).collect();
        let schedule = Schedule::new(temperatures, vec![100; 40]).unwrap();
        let config = AnnealConfig::default().with_seed(42);

        let result = Annealer::run(&Quadratic, &9.0, &schedule, &config).unwrap();
        assert!(
            result.best_energy < 0.5,
            "expected near-zero energy, got {}",
            result.best_energy
        );
    }

    #[test]
    fn test_history_non_increasing() {
        let schedule = Schedule::linear(0.01, 5.0, 0, 300, 20).unwrap();
        let config = AnnealConfig::default().with_seed(3).with_history(true);
        let result = Annealer::run(&Quadratic, &5.0, &schedule, &config).unwrap();

        assert_eq!(result.energy_history.len(), schedule.len());
        for window in result.energy_history.windows(2) {
            assert!(window[1] <= window[0]);
        }
    }

    #[test]
    fn test_empty_schedule_returns_initial() {
        let schedule = Schedule::new(vec![], vec![]).unwrap();
        let config = AnnealConfig::default().with_seed(1);
        let result = Annealer::run(&Quadratic, &3.0, &schedule, &config).unwrap();
        assert!((result.best - 3.0).abs() < 1e-15);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_invalid_k_rejected() {
        let config = AnnealConfig::default().with_k(0.0);
        let err = Annealer::run(&Quadratic, &3.0, &schedule(), &config).unwrap_err();
        assert!(matches!(err, AnnealError::Config(Error::InvalidConfig(_))));
    }

    #[derive(Debug, PartialEq)]
    struct Boom(usize);

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom at call {}", self.0)
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_problem_error_propagates_unmodified() {
        let calls = Cell::new(0usize);
        let problem = FnProblem::new(
            |x: &i64, _: &mut dyn RngCore| Ok(x + 1),
            |x: &i64| {
                calls.set(calls.get() + 1);
                if calls.get() == 4 {
                    Err(Boom(4))
                } else {
                    Ok(*x as f64)
                }
            },
        );
        let config = AnnealConfig::default().with_seed(0);
        let err = Annealer::run(&problem, &0, &schedule(), &config).unwrap_err();

        match err {
            AnnealError::Problem(inner) => assert_eq!(inner, Boom(4)),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_anneal_returns_best_state() {
        let problem = FnProblem::new(
            |v: &Vec<i32>, _: &mut dyn RngCore| {
                let mut next = v.clone();
                if let Some(first) = next.first_mut() {
                    *first -= 1;
                }
                Ok::<_, Infallible>(next)
            },
            |v: &Vec<i32>| Ok(v.iter().map(|x| (*x as f64).abs()).sum::<f64>()),
        );
        let initial = vec![3, 1];
        let schedule = Schedule::new(vec![0.0], vec![3]).unwrap();
        let best = Annealer::anneal(&problem, &initial, &schedule, &AnnealConfig::default())
            .unwrap();

        assert_eq!(best, vec![0, 1]);
        assert_eq!(initial, vec![3, 1]);
    }

    #[test]
    fn test_fn_problem_moves_use_seeded_rng() {
        let problem = FnProblem::new(
            |x: &f64, rng: &mut dyn RngCore| Ok::<_, Infallible>(x + rng.random_range(-1.0..1.0)),
            |x: &f64| Ok(x * x),
        );
        let schedule = Schedule::linear(0.01, 2.0, 0, 200, 40).unwrap();
        let config = AnnealConfig::default().with_seed(11);

        let a = Annealer::run(&problem, &4.0, &schedule, &config).unwrap();
        let b = Annealer::run(&problem, &4.0, &schedule, &config).unwrap();
        assert_eq!(a.best.to_bits(), b.best.to_bits());
        assert_eq!(a.accepted_moves, b.accepted_moves);
        // Moves are random, so some candidates improve on the start.
        assert!(a.improving_moves > 0);
        assert!(a.best_energy < a.initial_energy);
    }

    proptest! {
        #[test]
        fn prop_best_never_worse_than_initial(seed in any::<u64>(), start in -20.0f64..20.0) {
            let schedule = Schedule::linear(0.1, 4.0, 0, 60, 15).unwrap();
            let config = AnnealConfig::default().with_seed(seed).with_history(true);
            let result = Annealer::run(&Quadratic, &start, &schedule, &config).unwrap();

            prop_assert!(result.best_energy <= result.initial_energy);
            for window in result.energy_history.windows(2) {
                prop_assert!(window[1] <= window[0]);
            }
        }
    }
}
