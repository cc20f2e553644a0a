use std::{fmt, iter::FusedIterator};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::{
    OdeModel,
    error::{OdeError, StepTooSmall},
    rk::RungeKutta,
    saving::ResultStorage,
    stepping::{AdaptiveStepControl, StepBounds},
    tableau::ButcherTableau,
};

/// One accepted step of the solution trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub t: f64,
    pub y: f64,
    /// Local error estimate of the step that produced `y`.
    pub error: f64,
    /// Size of the step that produced `y`.
    pub h: f64,
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t = {:.5}, y = {:.8}, error = {:.2e}, h = {:.5e}",
            self.t, self.y, self.error, self.h
        )
    }
}

/// Current point of the integration and the next trial step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationState {
    pub t: f64,
    pub y: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Stepping,
    Terminated,
    Failed(StepTooSmall),
}

/// Integration statistics for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted: usize,
    pub rejected: usize,
    /// Total number of right-hand side evaluations
    pub rhs_evals: usize,
}

/// End point of a completed integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub t: f64,
    pub y: f64,
    pub stats: SolverStats,
}

/// Adaptive Dormand-Prince 4(5) integrator.
///
/// Yields one [`OutputRecord`] per accepted step in increasing time. The
/// sequence ends with the record at the final time, or with a single
/// [`OdeError::StepSizeUnderflow`] when no step size above the minimum meets
/// the tolerance.
pub struct Integrator<Model: OdeModel> {
    model: Model,
    rk: RungeKutta<7>,
    step_control: AdaptiveStepControl,
    bounds: StepBounds,
    state: IntegrationState,
    tf: f64,
    tol: f64,
    status: Status,
    accepted: usize,
    rejected: usize,
}

impl<Model: OdeModel> Integrator<Model> {
    pub(crate) fn new(
        model: Model,
        tspan: (f64, f64),
        y0: f64,
        tol: f64,
        step_control: AdaptiveStepControl,
    ) -> Result<Self, OdeError> {
        let (t0, tf) = tspan;
        validate_inputs(t0, tf, tol)?;
        step_control.validate()?;

        let span = tf - t0;
        let bounds = step_control.bounds(span);
        let h = bounds.clamp(step_control.initial_step(span)).min(span);

        Ok(Self {
            model,
            rk: RungeKutta::new(ButcherTableau::<7>::DORMANDPRINCE45),
            step_control,
            bounds,
            state: IntegrationState { t: t0, y: y0, h },
            tf,
            tol,
            status: Status::Stepping,
            accepted: 0,
            rejected: 0,
        })
    }

    pub fn state(&self) -> IntegrationState {
        self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn bounds(&self) -> StepBounds {
        self.bounds
    }

    pub fn stats(&self) -> SolverStats {
        SolverStats {
            accepted: self.accepted,
            rejected: self.rejected,
            rhs_evals: self.rk.rhs_evals(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Retries trial steps from the current point until one is accepted.
    ///
    /// Returns `Ok(None)` once the integration has finished.
    pub fn advance(&mut self) -> Result<Option<OutputRecord>, StepTooSmall> {
        if self.status != Status::Stepping {
            return Ok(None);
        }

        loop {
            let IntegrationState { t, y, h } = self.state;
            let is_final = h >= self.tf - t;
            // only a step truncated to land on tf may go below the floor
            debug_assert!(h >= self.bounds.min || is_final);

            let result = self.rk.step(&mut self.model, t, y, h);
            let h_new = self.step_control.next_step_size(h, result.error, self.tol);

            if result.error > self.tol {
                self.rejected += 1;
                if h <= self.bounds.min {
                    return Err(self.fail());
                }
                debug!(t, h, error = result.error, "step rejected");
                // s rounds to 1 when the error is within a few ulps of tol
                let h_shrunk = if h_new < h {
                    h_new
                } else {
                    h * self.step_control.min_growth
                };
                self.state.h = h_shrunk.max(self.bounds.min).min(self.tf - t);
                continue;
            }

            self.rk.accept();
            self.accepted += 1;

            let t_next = if is_final { self.tf } else { t + h };
            self.state.t = t_next;
            self.state.y = result.y5;

            let record = OutputRecord {
                t: t_next,
                y: result.y5,
                error: result.error,
                h,
            };
            trace!(t = record.t, y = record.y, error = record.error, h, "step accepted");

            if t_next >= self.tf {
                self.status = Status::Terminated;
                let stats = self.stats();
                info!(
                    accepted = stats.accepted,
                    rejected = stats.rejected,
                    rhs_evals = stats.rhs_evals,
                    "integration finished"
                );
            } else {
                self.state.h = self.bounds.clamp(h_new).min(self.tf - t_next);
            }
            return Ok(Some(record));
        }
    }

    /// Drives the integration to the end, saving every accepted step.
    ///
    /// The storage is flushed on both outcomes, so after a step size
    /// underflow it holds the accepted prefix of the trajectory.
    pub fn solve(&mut self, result: &mut ResultStorage) -> Result<Solution, OdeError> {
        let outcome = loop {
            match self.advance() {
                Ok(Some(record)) => result.save(&record)?,
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        result.truncate()?;
        outcome?;

        Ok(Solution {
            t: self.state.t,
            y: self.state.y,
            stats: self.stats(),
        })
    }

    fn fail(&mut self) -> StepTooSmall {
        let IntegrationState { t, h, .. } = self.state;
        let err = StepTooSmall {
            t,
            h,
            h_min: self.bounds.min,
        };
        warn!(t, h, h_min = self.bounds.min, "step size too small");
        self.status = Status::Failed(err);
        err
    }
}

impl<Model: OdeModel> Iterator for Integrator<Model> {
    type Item = Result<OutputRecord, OdeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().map_err(OdeError::from).transpose()
    }
}

impl<Model: OdeModel> FusedIterator for Integrator<Model> {}

pub(crate) fn validate_inputs(t0: f64, tf: f64, tol: f64) -> Result<(), OdeError> {
    if !(t0.is_finite() && tf.is_finite() && t0 < tf) {
        return Err(OdeError::InvalidTimeSpan { t0, tf });
    }
    if !(tol.is_finite() && tol > 0.0) {
        return Err(OdeError::InvalidTolerance(tol));
    }
    Ok(())
}
