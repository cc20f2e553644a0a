use std::array;

/// Coefficients of an explicit embedded Runge-Kutta pair.
///
/// `b` gives the propagated solution of order `order`, `b_hat` the embedded
/// solution one order lower that is only used to estimate the local error.
/// Stages are indexed from 0, so `a[i]` couples stage `i` to stages `0..i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButcherTableau<const STAGES: usize> {
    pub a: [[f64; STAGES]; STAGES],
    pub b: [f64; STAGES],
    pub b_hat: [f64; STAGES],
    pub c: [f64; STAGES],
    /// Order of the propagated solution.
    pub order: usize,
}

impl<const STAGES: usize> ButcherTableau<STAGES> {
    /// Sum of the coupling coefficients of stage `i`, which equals `c[i]`
    /// for a consistent method.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.a[i].iter().sum()
    }

    /// True when the last stage is evaluated at the propagated solution,
    /// so its derivative can start the next step.
    pub fn is_fsal(&self) -> bool {
        STAGES > 0 && self.a[STAGES - 1] == self.b && self.c[STAGES - 1] == 1.0
    }

    /// Weights of the difference between the two embedded solutions.
    pub fn error_weights(&self) -> [f64; STAGES] {
        array::from_fn(|i| self.b[i] - self.b_hat[i])
    }
}

impl ButcherTableau<7> {
    // usage is ButcherTableau::<7>::DORMANDPRINCE45
    pub const DORMANDPRINCE45: Self = Self {
        a: [
            [0., 0., 0., 0., 0., 0., 0.],
            [1. / 5., 0., 0., 0., 0., 0., 0.],
            [3. / 40., 9. / 40., 0., 0., 0., 0., 0.],
            [44. / 45., -56. / 15., 32. / 9., 0., 0., 0., 0.],
            [
                19372. / 6561.,
                -25360. / 2187.,
                64448. / 6561.,
                -212. / 729.,
                0.,
                0.,
                0.,
            ],
            [
                9017. / 3168.,
                -355. / 33.,
                46732. / 5247.,
                49. / 176.,
                -5103. / 18656.,
                0.,
                0.,
            ],
            [
                35. / 384.,
                0.,
                500. / 1113.,
                125. / 192.,
                -2187. / 6784.,
                11. / 84.,
                0.,
            ],
        ],
        b: [
            35. / 384.,
            0.,
            500. / 1113.,
            125. / 192.,
            -2187. / 6784.,
            11. / 84.,
            0.,
        ],
        b_hat: [
            5179. / 57600.,
            0.,
            7571. / 16695.,
            393. / 640.,
            -92097. / 339200.,
            187. / 2100.,
            1. / 40.,
        ],
        c: [0., 1. / 5., 3. / 10., 4. / 5., 8. / 9., 1.0, 1.0],
        order: 5,
    };
}
