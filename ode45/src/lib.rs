//! Adaptive Dormand-Prince 4(5) integrator for scalar ordinary differential
//! equations `dy/dt = f(t, y)`.
//!
//! ```
//! use ode45::integrate;
//!
//! let records = integrate(|_t: f64, y: f64| -2.0 * y, 0.0, 1.0, 1.0, 1e-6)
//!     .unwrap()
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! let last = records.last().unwrap();
//! assert_eq!(last.t, 1.0);
//! assert!((last.y - (-2.0_f64).exp()).abs() < 1e-6);
//! ```

/// Submodules for core ODE system components.
pub mod error;
pub mod rk;
pub mod saving;
pub mod solvers;
pub mod stepping;
pub mod tableau;

pub use error::{OdeError, StepTooSmall};
pub use saving::{MemoryResult, ResultStorage};
pub use solvers::{Integrator, OutputRecord, Solution, SolverStats, Status};
pub use stepping::AdaptiveStepControl;

/// Right-hand side of a scalar ODE.
///
/// Implemented for every `FnMut(f64, f64) -> f64`, so plain functions and
/// closures can be passed directly.
pub trait OdeModel {
    /// Compute the derivative at time `t` and state `y`.
    fn f(&mut self, t: f64, y: f64) -> f64;
}

impl<F> OdeModel for F
where
    F: FnMut(f64, f64) -> f64,
{
    fn f(&mut self, t: f64, y: f64) -> f64 {
        self(t, y)
    }
}

/// Container for a complete ODE problem: model, time span, initial value,
/// tolerance and step size control.
pub struct OdeProblem<Model: OdeModel> {
    model: Model,
    tspan: (f64, f64),
    y0: f64,
    tol: f64,
    step_control: AdaptiveStepControl,
}

impl<Model: OdeModel> OdeProblem<Model> {
    /// Creates a new `OdeProblem`.
    ///
    /// Fails if the time span is empty, reversed or not finite, or if the
    /// tolerance is not positive.
    pub fn new(model: Model, tspan: (f64, f64), y0: f64, tol: f64) -> Result<Self, OdeError> {
        solvers::validate_inputs(tspan.0, tspan.1, tol)?;
        Ok(Self {
            model,
            tspan,
            y0,
            tol,
            step_control: AdaptiveStepControl::default(),
        })
    }

    pub fn with_step_control(mut self, step_control: AdaptiveStepControl) -> Self {
        self.step_control = step_control;
        self
    }

    /// Lazy integrator yielding the accepted steps.
    pub fn integrator(self) -> Result<Integrator<Model>, OdeError> {
        Integrator::new(
            self.model,
            self.tspan,
            self.y0,
            self.tol,
            self.step_control,
        )
    }

    /// Integrates over the whole time span, saving every accepted step.
    pub fn solve(self, result: &mut ResultStorage) -> Result<Solution, OdeError> {
        self.integrator()?.solve(result)
    }
}

/// Integrates `dy/dt = f(t, y)`, `y(t0) = y0` up to `tf` with the default
/// step size control.
pub fn integrate<Model: OdeModel>(
    f: Model,
    t0: f64,
    y0: f64,
    tf: f64,
    tol: f64,
) -> Result<Integrator<Model>, OdeError> {
    OdeProblem::new(f, (t0, tf), y0, tol)?.integrator()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[derive(Debug)]
    struct Logistic {
        r: f64,
    }

    impl OdeModel for Logistic {
        fn f(&mut self, _t: f64, y: f64) -> f64 {
            self.r * y * (1.0 - y)
        }
    }

    #[test]
    fn test_struct_model() {
        let mut result = ResultStorage::None;
        let solution = OdeProblem::new(Logistic { r: 3.0 }, (0.0, 2.0), 0.1, 1e-8)
            .unwrap()
            .solve(&mut result)
            .unwrap();
        let exact = 1.0 / (1.0 + 9.0 * (-6.0_f64).exp());
        assert_eq!(solution.t, 2.0);
        assert_abs_diff_eq!(solution.y, exact, epsilon = 1e-7);
        assert!(solution.stats.accepted > 0);
    }

    #[test]
    fn test_invalid_step_control_rejected() {
        let result = OdeProblem::new(|_t: f64, y: f64| y, (0.0, 1.0), 1.0, 1e-6)
            .unwrap()
            .with_step_control(AdaptiveStepControl::default().with_min_dt(-1.0))
            .integrator();
        assert!(matches!(result, Err(OdeError::InvalidStepControl(_))));
    }

    #[test]
    fn test_negative_start_time() {
        let records: Vec<OutputRecord> = integrate(|t: f64, _y: f64| 2.0 * t, -1.0, 1.0, 1.0, 1e-8)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        let last = records.last().unwrap();
        assert_eq!(last.t, 1.0);
        // y = t^2
        assert_abs_diff_eq!(last.y, 1.0, epsilon = 1e-12);
    }
}
