use clap::ValueEnum;
use ode45::OdeModel;

/// Right-hand sides available from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// dy/dt = -2 y^2 sin(t) exp(-2 y)
    Bundled,
    /// dy/dt = -rate * y
    Decay,
    /// dy/dt = rate * y * (1 - y)
    Logistic,
}

#[derive(Debug, Clone, Copy)]
pub struct BuiltinModel {
    pub kind: ModelKind,
    pub rate: f64,
}

impl OdeModel for BuiltinModel {
    fn f(&mut self, t: f64, y: f64) -> f64 {
        match self.kind {
            ModelKind::Bundled => -2.0 * y.powi(2) * t.sin() * (-2.0 * y).exp(),
            ModelKind::Decay => -self.rate * y,
            ModelKind::Logistic => self.rate * y * (1.0 - y),
        }
    }
}
