use serde::{Deserialize, Serialize};

use crate::error::OdeError;

/// Adaptive step size controller.
///
/// Rescales the step with the power law `s = (tol / (error + epsilon))^exponent`,
/// limited to `[min_growth, max_growth]` per adjustment. The step bounds are
/// derived from the length of the integration interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveStepControl {
    /// The first trial step is the interval length divided by this.
    pub initial_divisor: f64,
    /// Absolute floor on the step size.
    pub min_dt: f64,
    /// Largest step as a fraction of the interval length.
    pub max_dt_fraction: f64,
    /// Absolute largest step, takes precedence over `max_dt_fraction`.
    pub max_dt: Option<f64>,
    /// 1 / (order of the propagated solution).
    pub exponent: f64,
    /// Keeps the rescaling finite when the error estimate vanishes.
    pub epsilon: f64,
    pub min_growth: f64,
    pub max_growth: f64,
}

impl Default for AdaptiveStepControl {
    fn default() -> Self {
        Self {
            initial_divisor: 1e4,
            min_dt: 1e-6,
            max_dt_fraction: 0.2,
            max_dt: None,
            exponent: 0.2,
            epsilon: 1e-10,
            min_growth: 0.1,
            max_growth: 5.0,
        }
    }
}

impl AdaptiveStepControl {
    /// Computes the next step size from the current step and its error estimate.
    ///
    /// - `h`: current step size
    /// - `error`: absolute local error estimate of the step
    /// - `tol`: absolute tolerance
    pub fn next_step_size(&self, h: f64, error: f64, tol: f64) -> f64 {
        let s = (tol / (error + self.epsilon)).powf(self.exponent);
        // max/min rather than clamp: a NaN error falls back to the smallest factor
        h * s.max(self.min_growth).min(self.max_growth)
    }

    /// Step size limits for an interval of length `span`.
    pub fn bounds(&self, span: f64) -> StepBounds {
        let max = self.max_dt.unwrap_or(span * self.max_dt_fraction);
        StepBounds {
            min: self.min_dt,
            max: max.max(self.min_dt),
        }
    }

    /// First trial step for an interval of length `span`, before clamping.
    pub fn initial_step(&self, span: f64) -> f64 {
        span / self.initial_divisor
    }

    pub fn validate(&self) -> Result<(), OdeError> {
        if !(self.initial_divisor.is_finite() && self.initial_divisor >= 1.0) {
            return Err(OdeError::InvalidStepControl(
                "initial_divisor must be finite and at least 1",
            ));
        }
        if !(self.min_dt.is_finite() && self.min_dt > 0.0) {
            return Err(OdeError::InvalidStepControl(
                "min_dt must be positive and finite",
            ));
        }
        if !(self.max_dt_fraction > 0.0 && self.max_dt_fraction <= 1.0) {
            return Err(OdeError::InvalidStepControl(
                "max_dt_fraction must be in (0, 1]",
            ));
        }
        if let Some(max_dt) = self.max_dt {
            if !(max_dt.is_finite() && max_dt >= self.min_dt) {
                return Err(OdeError::InvalidStepControl(
                    "max_dt must be finite and not less than min_dt",
                ));
            }
        }
        if !(self.exponent.is_finite() && self.exponent > 0.0) {
            return Err(OdeError::InvalidStepControl(
                "exponent must be positive and finite",
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(OdeError::InvalidStepControl(
                "epsilon must be non-negative and finite",
            ));
        }
        // a rejected step has to shrink, otherwise the retry loop never ends
        if !(self.min_growth > 0.0 && self.min_growth < 1.0) {
            return Err(OdeError::InvalidStepControl("min_growth must be in (0, 1)"));
        }
        if !(self.max_growth.is_finite() && self.max_growth >= 1.0) {
            return Err(OdeError::InvalidStepControl(
                "max_growth must be finite and at least 1",
            ));
        }
        Ok(())
    }

    pub fn with_initial_divisor(mut self, initial_divisor: f64) -> Self {
        self.initial_divisor = initial_divisor;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = min_dt;
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_max_dt_fraction(mut self, max_dt_fraction: f64) -> Self {
        self.max_dt_fraction = max_dt_fraction;
        self
    }

    pub fn with_exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_growth_limits(mut self, min_growth: f64, max_growth: f64) -> Self {
        self.min_growth = min_growth;
        self.max_growth = max_growth;
        self
    }
}

/// Admissible step sizes for one integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepBounds {
    pub min: f64,
    pub max: f64,
}

impl StepBounds {
    pub fn clamp(&self, h: f64) -> f64 {
        h.max(self.min).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_zero_error_grows_to_limit() {
        let control = AdaptiveStepControl::default();
        // (1e-6 / 1e-10)^0.2 ~ 6.3, limited to 5
        assert_relative_eq!(control.next_step_size(0.01, 0.0, 1e-6), 0.05);
    }

    #[test]
    fn test_large_error_shrinks_to_limit() {
        let control = AdaptiveStepControl::default();
        assert_relative_eq!(control.next_step_size(0.01, 1.0, 1e-6), 0.001);
    }

    #[test]
    fn test_power_law_between_limits() {
        let control = AdaptiveStepControl::default();
        let tol = 1e-6;
        let error = 32.0 * tol - control.epsilon;
        // (1/32)^0.2 = 0.5
        assert_relative_eq!(control.next_step_size(0.1, error, tol), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_error_at_tolerance_keeps_step() {
        let control = AdaptiveStepControl::default();
        let h = control.next_step_size(0.1, 1e-6, 1e-6);
        assert!(h < 0.1);
        assert_abs_diff_eq!(h, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_nan_error_shrinks() {
        let control = AdaptiveStepControl::default();
        assert_relative_eq!(control.next_step_size(0.1, f64::NAN, 1e-6), 0.01);
    }

    #[test]
    fn test_bounds_from_interval() {
        let control = AdaptiveStepControl::default();
        let bounds = control.bounds(2.0);
        assert_eq!(bounds.min, 1e-6);
        assert_relative_eq!(bounds.max, 0.4);
        assert_relative_eq!(control.initial_step(2.0), 2e-4);

        let bounds = control.with_max_dt(0.05).bounds(2.0);
        assert_relative_eq!(bounds.max, 0.05);
        assert_relative_eq!(bounds.clamp(1.0), 0.05);
        assert_relative_eq!(bounds.clamp(1e-9), 1e-6);
    }

    #[test]
    fn test_bounds_never_inverted() {
        let bounds = AdaptiveStepControl::default().bounds(1e-7);
        assert_eq!(bounds.max, bounds.min);
    }

    #[test]
    fn test_validate() {
        assert!(AdaptiveStepControl::default().validate().is_ok());
        let invalid = [
            AdaptiveStepControl::default().with_min_dt(0.0),
            AdaptiveStepControl::default().with_min_dt(f64::NAN),
            AdaptiveStepControl::default().with_initial_divisor(0.5),
            AdaptiveStepControl::default().with_max_dt_fraction(0.0),
            AdaptiveStepControl::default().with_max_dt(1e-9),
            AdaptiveStepControl::default().with_exponent(0.0),
            AdaptiveStepControl::default().with_epsilon(-1.0),
            AdaptiveStepControl::default().with_growth_limits(1.0, 5.0),
            AdaptiveStepControl::default().with_growth_limits(0.1, 0.5),
        ];
        for control in invalid {
            assert!(
                matches!(control.validate(), Err(OdeError::InvalidStepControl(_))),
                "{control:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let control: AdaptiveStepControl =
            ron::from_str("(min_dt: 1e-8, max_dt: Some(0.01))").unwrap();
        assert_eq!(control.min_dt, 1e-8);
        assert_eq!(control.max_dt, Some(0.01));
        assert_eq!(control.initial_divisor, 1e4);
        assert_eq!(control.max_growth, 5.0);
    }
}
