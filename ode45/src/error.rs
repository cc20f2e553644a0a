use thiserror::Error;

/// Reported when no admissible step size meets the tolerance.
///
/// Records accepted before this point remain valid.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("step size too small: h = {h:e} is below h_min = {h_min:e} at t = {t}")]
pub struct StepTooSmall {
    /// Time the integrator was stuck at.
    pub t: f64,
    /// Last trial step size.
    pub h: f64,
    pub h_min: f64,
}

#[derive(Debug, Error)]
pub enum OdeError {
    #[error("initial time ({t0}) must be finite and less than final time ({tf})")]
    InvalidTimeSpan { t0: f64, tf: f64 },
    #[error("tolerance must be positive and finite (got {0})")]
    InvalidTolerance(f64),
    #[error("invalid step control: {0}")]
    InvalidStepControl(&'static str),
    #[error("{0}")]
    StepSizeUnderflow(#[from] StepTooSmall),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Csv(#[from] csv::Error),
}
