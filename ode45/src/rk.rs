use crate::{OdeModel, tableau::ButcherTableau};

/// Derivative samples of one trial step.
///
/// `k[i]` is the right-hand side evaluated at stage `i`; the step size is
/// applied when the samples are combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageBuffer<const STAGES: usize> {
    pub k: [f64; STAGES],
}

impl<const STAGES: usize> Default for StageBuffer<STAGES> {
    fn default() -> Self {
        Self { k: [0.0; STAGES] }
    }
}

/// Both solutions of an embedded pair for one trial step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Embedded lower order solution.
    pub y4: f64,
    /// Propagated higher order solution.
    pub y5: f64,
    /// |y5 - y4|
    pub error: f64,
}

/// Stage evaluator and error estimator for an explicit embedded pair.
pub struct RungeKutta<const STAGES: usize> {
    tableau: ButcherTableau<STAGES>,
    error_weights: [f64; STAGES],
    fsal: bool,
    stage: StageBuffer<STAGES>,
    // f(t, y) at the start of the next trial step when it is already known
    first_derivative: Option<f64>,
    rhs_evals: usize,
}

impl<const STAGES: usize> RungeKutta<STAGES> {
    pub fn new(tableau: ButcherTableau<STAGES>) -> Self {
        Self {
            error_weights: tableau.error_weights(),
            fsal: tableau.is_fsal(),
            tableau,
            stage: StageBuffer::default(),
            first_derivative: None,
            rhs_evals: 0,
        }
    }

    pub fn tableau(&self) -> &ButcherTableau<STAGES> {
        &self.tableau
    }

    pub fn stages(&self) -> &StageBuffer<STAGES> {
        &self.stage
    }

    /// Number of right-hand side evaluations so far.
    pub fn rhs_evals(&self) -> usize {
        self.rhs_evals
    }

    /// Evaluates every stage of a trial step of size `h` from `(t, y)`.
    ///
    /// The first stage is reused when it is already known: after a rejection
    /// the step restarts from the same point, and after an accepted step of a
    /// FSAL pair the last stage was evaluated at the new point.
    pub fn compute_stages<Model: OdeModel>(
        &mut self,
        model: &mut Model,
        t: f64,
        y: f64,
        h: f64,
    ) -> &StageBuffer<STAGES> {
        let k = &mut self.stage.k;

        // k0
        k[0] = match self.first_derivative {
            Some(derivative) => derivative,
            None => {
                self.rhs_evals += 1;
                model.f(t, y)
            }
        };
        self.first_derivative = Some(k[0]);

        // k1 - ks, each depends on all the previous ones
        for s in 1..STAGES {
            let y_stage = y + h * weighted_sum(&self.tableau.a[s][..s], &k[..s]);
            k[s] = model.f(t + self.tableau.c[s] * h, y_stage);
            self.rhs_evals += 1;
        }
        &self.stage
    }

    /// Combines the current stages into the two embedded solutions.
    ///
    /// `y5` uses the order-5 row `b` (35/384, ...), the propagated solution;
    /// `y4` uses the order-4 row `b_hat` (5179/57600, ...) only for the error.
    pub fn estimate(&self, y: f64, h: f64) -> StepResult {
        let k = &self.stage.k;
        // summed in the same order as the last stage so a FSAL derivative
        // belongs to exactly this y5
        let y5 = y + h * weighted_sum(&self.tableau.b, k);
        let y4 = y + h * weighted_sum(&self.tableau.b_hat, k);
        // formed from the weight differences, y5 - y4 would cancel against y
        let error = (h * weighted_sum(&self.error_weights, k)).abs();
        StepResult { y4, y5, error }
    }

    /// Computes the stages and the error estimate of one trial step.
    pub fn step<Model: OdeModel>(
        &mut self,
        model: &mut Model,
        t: f64,
        y: f64,
        h: f64,
    ) -> StepResult {
        self.compute_stages(model, t, y, h);
        self.estimate(y, h)
    }

    /// Commits the last trial step; the next one starts from its end point.
    pub fn accept(&mut self) {
        self.first_derivative = if self.fsal {
            Some(self.stage.k[STAGES - 1])
        } else {
            None
        };
    }
}

fn weighted_sum(weights: &[f64], k: &[f64]) -> f64 {
    weights.iter().zip(k).map(|(w, k)| w * k).sum()
}
