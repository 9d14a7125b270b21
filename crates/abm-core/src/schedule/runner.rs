//! Simulation Runner
//!
//! Owns a model's ECS world and schedule and advances them one step at a time.

use abm_records::{RunMetadata, RunReport, Series};
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use tracing::{debug, info};

use crate::collector::{collect_world, DataCollector};
use crate::schedule::StepClock;

/// A ready-to-run model
pub struct Simulation {
    model: String,
    seed: u64,
    world: World,
    schedule: Schedule,
}

impl Simulation {
    /// Wrap a fully set-up world. Records the initial state as step 0.
    pub fn new(model: impl Into<String>, seed: u64, mut world: World, mut schedule: Schedule) -> Self {
        // One thread keeps system order, and with it RNG consumption, fixed per seed
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        if !world.contains_resource::<StepClock>() {
            world.insert_resource(StepClock::new());
        }
        collect_world(&mut world);

        let model = model.into();
        info!(model = %model, seed, "Simulation ready");
        Self {
            model,
            seed,
            world,
            schedule,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Completed steps
    pub fn current_step(&self) -> u64 {
        self.world.resource::<StepClock>().step
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Advance by one step and record it
    pub fn step(&mut self) {
        self.world.resource_mut::<StepClock>().advance();
        self.schedule.run(&mut self.world);
        collect_world(&mut self.world);
        debug!(model = %self.model, step = self.current_step(), "Step complete");
    }

    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Step until `done` holds or `max_steps` have run. Returns the steps taken.
    pub fn run_until(&mut self, max_steps: u64, done: impl Fn(&World) -> bool) -> u64 {
        let mut taken = 0;
        while taken < max_steps && !done(&self.world) {
            self.step();
            taken += 1;
        }
        taken
    }

    /// Everything collected so far
    pub fn series(&self) -> Series {
        self.world
            .get_resource::<DataCollector>()
            .map(|c| c.series().clone())
            .unwrap_or_default()
    }

    /// Report of the run so far
    pub fn report(&self) -> RunReport {
        let mut report = RunReport::new(RunMetadata::new(
            self.model.clone(),
            self.seed,
            self.current_step(),
        ));
        report.series = self.series();
        report
    }
}
