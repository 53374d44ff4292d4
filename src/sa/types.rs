//! Core trait for Simulated Annealing.

use rand::{Rng, RngCore};
use std::marker::PhantomData;

/// Defines a Simulated Annealing problem.
///
/// The user implements neighbor generation and energy evaluation.
/// The annealer handles the temperature schedule, the acceptance
/// criterion and best-state tracking.
///
/// Both operations are fallible. Whatever error they return is handed
/// back to the caller unmodified; the annealer performs no recovery.
/// Problems that cannot fail use [`std::convert::Infallible`].
///
/// # Minimization
///
/// The annealer minimizes energy. For maximization, negate it.
///
/// # Examples
///
/// ```
/// use rand::{Rng, RngCore};
/// use std::convert::Infallible;
/// use u_simlab::sa::AnnealProblem;
///
/// struct Parabola;
///
/// impl AnnealProblem for Parabola {
///     type State = f64;
///     type Error = Infallible;
///
///     fn neighbor<R: Rng>(&self, x: &f64, rng: &mut R) -> Result<f64, Infallible> {
///         Ok(x + rng.random_range(-1.0..1.0))
///     }
///
///     fn energy(&self, x: &f64) -> Result<f64, Infallible> {
///         Ok(x * x)
///     }
/// }
/// ```
pub trait AnnealProblem {
    /// The state representation. `Clone` is the "copy" capability: the
    /// annealer never aliases a state across iterations.
    type State: Clone;

    /// Error raised by the caller's move or energy function.
    type Error;

    /// Produces a neighbor of `state`.
    ///
    /// Must not mutate `state`; the annealer keeps using it when the
    /// candidate is rejected.
    fn neighbor<R: Rng>(&self, state: &Self::State, rng: &mut R)
        -> Result<Self::State, Self::Error>;

    /// Computes the energy of a state. Lower is better.
    fn energy(&self, state: &Self::State) -> Result<f64, Self::Error>;
}

/// Adapts a pair of plain functions into an [`AnnealProblem`].
///
/// The move function receives the annealer's random source, so a seeded
/// run stays reproducible.
///
/// ```
/// use rand::{Rng, RngCore};
/// use std::convert::Infallible;
/// use u_simlab::sa::FnProblem;
///
/// let problem = FnProblem::new(
///     |x: &i64, rng: &mut dyn RngCore| Ok::<_, Infallible>(x + rng.random_range(-1..=1)),
///     |x: &i64| Ok::<_, Infallible>(x.abs() as f64),
/// );
/// # let _ = problem;
/// ```
pub struct FnProblem<S, E, M, O> {
    mv: M,
    objective: O,
    _marker: PhantomData<fn(&S) -> E>,
}

impl<S, E, M, O> FnProblem<S, E, M, O>
where
    M: Fn(&S, &mut dyn RngCore) -> Result<S, E>,
    O: Fn(&S) -> Result<f64, E>,
{
    /// Wraps a move function and an objective function.
    pub fn new(mv: M, objective: O) -> Self {
        Self {
            mv,
            objective,
            _marker: PhantomData,
        }
    }
}

impl<S, E, M, O> AnnealProblem for FnProblem<S, E, M, O>
where
    S: Clone,
    M: Fn(&S, &mut dyn RngCore) -> Result<S, E>,
    O: Fn(&S) -> Result<f64, E>,
{
    type State = S;
    type Error = E;

    fn neighbor<R: Rng>(&self, state: &S, rng: &mut R) -> Result<S, E> {
        let rng: &mut dyn RngCore = rng;
        (self.mv)(state, rng)
    }

    fn energy(&self, state: &S) -> Result<f64, E> {
        (self.objective)(state)
    }
}
