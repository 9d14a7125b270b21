//! Output
//!
//! JSON writers for reports and snapshots, and the run loop that emits
//! periodic grid snapshots.

pub mod snapshot;

pub use snapshot::{generate_snapshot, SnapshotGenerator};

use abm_records::{GridSnapshot, RunReport, Trajectory};
use bevy_ecs::world::World;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::SimResult;
use crate::schedule::Simulation;

pub const REPORT_FILE: &str = "report.json";
pub const TRAJECTORY_FILE: &str = "trajectory.json";
pub const SNAPSHOT_DIR: &str = "snapshots";

/// A directory receiving one run's files
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Create the directory (and its snapshot subdirectory) if missing
    pub fn create(root: impl Into<PathBuf>) -> SimResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(SNAPSHOT_DIR))?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> SimResult<PathBuf> {
        let path = self.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "Wrote JSON");
        Ok(path)
    }

    pub fn write_snapshot(&self, snapshot: &GridSnapshot) -> SimResult<PathBuf> {
        self.write_json(&format!("{}/{}.json", SNAPSHOT_DIR, snapshot.snapshot_id), snapshot)
    }

    pub fn write_report(&self, report: &RunReport) -> SimResult<PathBuf> {
        self.write_json(REPORT_FILE, report)
    }

    pub fn write_trajectory(&self, trajectory: &Trajectory) -> SimResult<PathBuf> {
        self.write_json(TRAJECTORY_FILE, trajectory)
    }
}

/// Run `steps` steps, writing a snapshot at the start, every
/// `snapshot_interval` steps, and at the end. The final snapshot is attached
/// to the returned report, which is also written when `out` is given.
pub fn run_with_snapshots(
    sim: &mut Simulation,
    steps: u64,
    snapshot_interval: u64,
    out: Option<&OutputDir>,
) -> SimResult<RunReport> {
    run_until_with_snapshots(sim, steps, snapshot_interval, out, |_| false)
}

/// Like [`run_with_snapshots`], but stops early once `done` holds
pub fn run_until_with_snapshots(
    sim: &mut Simulation,
    max_steps: u64,
    snapshot_interval: u64,
    out: Option<&OutputDir>,
    done: impl Fn(&World) -> bool,
) -> SimResult<RunReport> {
    let mut generator = SnapshotGenerator::new(snapshot_interval);
    let model = sim.model().to_string();

    let emit = |sim: &mut Simulation,
                trigger: &str,
                generator: &mut SnapshotGenerator|
     -> SimResult<Option<GridSnapshot>> {
        let snapshot = generate_snapshot(sim.world_mut(), &model, trigger, generator);
        if let (Some(snapshot), Some(out)) = (&snapshot, out) {
            out.write_snapshot(snapshot)?;
        }
        Ok(snapshot)
    };

    emit(sim, "simulation_start", &mut generator)?;
    let mut taken = 0;
    while taken < max_steps && !done(sim.world()) {
        sim.step();
        taken += 1;
        let step = sim.current_step();
        if generator.should_snapshot(step) && taken < max_steps && !done(sim.world()) {
            emit(sim, "periodic", &mut generator)?;
        }
    }
    let final_snapshot = emit(sim, "simulation_end", &mut generator)?;

    let mut report = sim.report();
    report.final_snapshot = final_snapshot;
    if let Some(out) = out {
        let path = out.write_report(&report)?;
        info!(
            path = %path.display(),
            steps = taken,
            snapshots = generator.snapshot_count(),
            "Run complete"
        );
    }
    Ok(report)
}
