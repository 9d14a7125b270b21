//! Agent-based modeling workbench CLI
//!
//! Runs one model per subcommand, prints its per-step table and writes the
//! report, snapshots and charts to the output directory.

use abm_core::config::{Config, IntegratorKind};
use abm_core::models::{growth, mutualism, predation, wealth};
use abm_core::ode::lotka_volterra;
use abm_core::output::{run_until_with_snapshots, run_with_snapshots, OutputDir};
use abm_core::{plot, Simulation};
use abm_records::{RunMetadata, RunReport};
use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "abm")]
#[command(about = "Agent-based modeling workbench")]
struct Cli {
    #[command(subcommand)]
    model: ModelCommand,
}

/// Options shared by every model
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Tuning file; defaults to ./tuning.toml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of steps to simulate
    #[arg(long)]
    steps: Option<u64>,

    /// Directory for reports, snapshots and charts
    #[arg(long)]
    output: Option<PathBuf>,

    /// Steps between grid snapshots (0 for start and end only)
    #[arg(long)]
    snapshot_interval: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum ModelCommand {
    /// Clones spreading into empty neighboring cells
    Growth {
        #[command(flatten)]
        run: RunArgs,

        /// Keep stepping until the grid is full (bounded by --steps)
        #[arg(long)]
        until_full: bool,
    },
    /// Boltzmann wealth exchange
    Wealth {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Grid predators and prey
    Predation {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Flowers and pollinators helping each other breed
    Mutualism {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Lotka-Volterra equations with time-series and phase plots
    LotkaVolterra {
        #[command(flatten)]
        run: RunArgs,

        /// Integrator: rk4 or dormand-prince
        #[arg(long, value_parser = parse_method)]
        method: Option<IntegratorKind>,

        /// End of the time span
        #[arg(long)]
        t_end: Option<f64>,

        /// Number of sample times
        #[arg(long)]
        samples: Option<usize>,
    },
}

fn parse_method(s: &str) -> Result<IntegratorKind, String> {
    match s {
        "rk4" => Ok(IntegratorKind::Rk4),
        "dormand-prince" | "dopri" => Ok(IntegratorKind::DormandPrince),
        other => Err(format!("unknown method '{}', expected rk4 or dormand-prince", other)),
    }
}

/// Resolved settings for one run
struct Settings {
    config: Config,
    seed: u64,
    steps: u64,
    snapshot_interval: u64,
    out: OutputDir,
}

impl Settings {
    fn resolve(args: &RunArgs) -> Result<Self, Box<dyn Error>> {
        let config = match &args.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(),
        };
        let out = OutputDir::create(args.output.clone().unwrap_or_else(|| config.output.dir.clone()))?;
        Ok(Self {
            seed: args.seed.unwrap_or(config.simulation.seed),
            steps: args.steps.unwrap_or(config.simulation.steps),
            snapshot_interval: args.snapshot_interval.unwrap_or(config.simulation.snapshot_interval),
            out,
            config,
        })
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli.model) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: ModelCommand) -> Result<(), Box<dyn Error>> {
    match command {
        ModelCommand::Growth { run, until_full } => {
            let s = Settings::resolve(&run)?;
            let mut sim = growth::build(&s.config.growth, s.seed)?;
            let report = if until_full {
                run_until_with_snapshots(
                    &mut sim,
                    s.steps,
                    s.snapshot_interval,
                    Some(&s.out),
                    growth::is_saturated,
                )?
            } else {
                run_with_snapshots(&mut sim, s.steps, s.snapshot_interval, Some(&s.out))?
            };
            finish(&sim, &report, &s.out, &["population"])
        }
        ModelCommand::Wealth { run } => {
            let s = Settings::resolve(&run)?;
            let mut sim = wealth::build(&s.config.wealth, s.seed)?;
            let report = run_with_snapshots(&mut sim, s.steps, s.snapshot_interval, Some(&s.out))?;
            finish(&sim, &report, &s.out, &["gini"])
        }
        ModelCommand::Predation { run } => {
            let s = Settings::resolve(&run)?;
            let mut sim = predation::build(&s.config.predation, s.seed)?;
            let report = run_with_snapshots(&mut sim, s.steps, s.snapshot_interval, Some(&s.out))?;
            finish(&sim, &report, &s.out, &["prey", "predators"])
        }
        ModelCommand::Mutualism { run } => {
            let s = Settings::resolve(&run)?;
            let mut sim = mutualism::build(&s.config.mutualism, s.seed)?;
            let report = run_with_snapshots(&mut sim, s.steps, s.snapshot_interval, Some(&s.out))?;
            finish(&sim, &report, &s.out, &["flowers", "pollinators"])
        }
        ModelCommand::LotkaVolterra {
            run,
            method,
            t_end,
            samples,
        } => {
            let s = Settings::resolve(&run)?;
            let mut lv = s.config.lotka_volterra.clone();
            if let Some(method) = method {
                lv.method = method;
            }
            if let Some(t_end) = t_end {
                lv.t_end = t_end;
            }
            if let Some(samples) = samples {
                lv.samples = samples;
            }
            solve_lotka_volterra(&lv, s.seed, &s.out)
        }
    }
}

/// Print the table and final grid, then chart the chosen columns
fn finish(
    sim: &Simulation,
    report: &RunReport,
    out: &OutputDir,
    chart_columns: &[&str],
) -> Result<(), Box<dyn Error>> {
    println!("{}", report.series.to_table());
    if let Some(snapshot) = &report.final_snapshot {
        println!("Step {}:", snapshot.step);
        println!("{}", snapshot.render_ascii());
    }

    let chart = out.join(&format!("{}.svg", sim.model()));
    plot::series_svg(&report.series, chart_columns, &chart, sim.model())?;
    info!(
        model = sim.model(),
        steps = sim.current_step(),
        output = %out.path().display(),
        "Finished"
    );
    Ok(())
}

fn solve_lotka_volterra(
    config: &abm_core::config::LotkaVolterraConfig,
    seed: u64,
    out: &OutputDir,
) -> Result<(), Box<dyn Error>> {
    let trajectory = lotka_volterra::solve(config)?;

    // Print roughly twenty evenly spaced rows
    let stride = (trajectory.len() / 20).max(1);
    println!("{:>10} {:>14} {:>14}", "t", "prey", "predators");
    for point in trajectory.points.iter().step_by(stride) {
        println!("{:>10.3} {:>14.4} {:>14.4}", point.t, point.state[0], point.state[1]);
    }

    out.write_trajectory(&trajectory)?;
    plot::time_series_svg(&trajectory, &out.join("lotka_volterra.svg"), "Lotka-Volterra populations")?;
    plot::phase_portrait_svg(&trajectory, 0, 1, &out.join("phase_plot.svg"), "Phase plot")?;

    let mut report = RunReport::new(RunMetadata::new("lotka_volterra", seed, trajectory.len() as u64));
    report.trajectory = Some(trajectory);
    out.write_report(&report)?;
    info!(output = %out.path().display(), "Finished");
    Ok(())
}
