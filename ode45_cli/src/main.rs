use std::{error::Error, fs, io, path::PathBuf, process::ExitCode};

use clap::Parser;
use colored::Colorize;
use ode45::{AdaptiveStepControl, OdeError, OdeProblem, ResultStorage};
use tracing::Level;

mod models;
use models::{BuiltinModel, ModelKind};

/// Integrate dy/dt = f(t, y) with the adaptive Dormand-Prince 4(5) method
#[derive(Debug, Parser)]
#[command(name = "ode45", version, about, long_about = None, allow_negative_numbers = true)]
struct Cli {
    /// Initial time
    #[arg(long, default_value_t = 0.0)]
    t0: f64,
    /// Initial value y(t0)
    #[arg(long, default_value_t = 1.0)]
    y0: f64,
    /// Final time
    #[arg(long, default_value_t = 1.0)]
    tf: f64,
    /// Absolute local error tolerance
    #[arg(long, default_value_t = 1e-6)]
    tol: f64,
    /// Right-hand side to integrate
    #[arg(long, value_enum, default_value_t = ModelKind::Bundled)]
    model: ModelKind,
    /// Rate constant of the decay and logistic models
    #[arg(long, default_value_t = 2.0)]
    rate: f64,
    /// RON file with step size control settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write the accepted steps to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Do not print a line per accepted step
    #[arg(short, long)]
    quiet: bool,
    /// Log solver diagnostics to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let step_control = match &cli.config {
        Some(path) => ron::from_str::<AdaptiveStepControl>(&fs::read_to_string(path)?)?,
        None => AdaptiveStepControl::default(),
    };

    let model = BuiltinModel {
        kind: cli.model,
        rate: cli.rate,
    };
    let mut integrator = OdeProblem::new(model, (cli.t0, cli.tf), cli.y0, cli.tol)?
        .with_step_control(step_control)
        .integrator()?;

    let mut results = Vec::new();
    if !cli.quiet {
        results.push(ResultStorage::trace(io::stdout()));
    }
    if let Some(path) = &cli.csv {
        results.push(ResultStorage::file(path)?);
    }

    let mut failure = None;
    for record in &mut integrator {
        match record {
            Ok(record) => {
                for result in &mut results {
                    result.save(&record)?;
                }
            }
            Err(err) => failure = Some(err),
        }
    }
    for result in &mut results {
        result.truncate()?;
    }

    let stats = integrator.stats();
    let summary = format!(
        "{} accepted, {} rejected, {} f evaluations",
        stats.accepted, stats.rejected, stats.rhs_evals
    );

    match failure {
        Some(OdeError::StepSizeUnderflow(err)) => {
            eprintln!("{} {}", "step size too small:".red(), err);
            eprintln!("{summary}");
            Ok(ExitCode::FAILURE)
        }
        Some(err) => Err(err.into()),
        None => {
            let state = integrator.state();
            println!(
                "{} y({}) = {:.8} ({summary})",
                "done:".green(),
                state.t,
                state.y
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
