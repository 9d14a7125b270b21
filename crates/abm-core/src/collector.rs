//! Data Collection
//!
//! Records named model-level and agent-level values after setup and after
//! every step.

use abm_records::{AgentRecord, Series, StepRecord};
use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use crate::components::AgentId;
use crate::schedule::StepClock;

/// Computes one model-level value from the whole world
pub type ModelReporter = fn(&mut World) -> f64;

/// Computes one value for a single agent; None skips the agent
pub type AgentReporter = fn(&World, Entity) -> Option<f64>;

/// Resource accumulating the run's series
#[derive(Resource, Default)]
pub struct DataCollector {
    model_reporters: BTreeMap<String, ModelReporter>,
    agent_reporters: BTreeMap<String, AgentReporter>,
    series: Series,
}

impl DataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_reporter(mut self, name: impl Into<String>, reporter: ModelReporter) -> Self {
        self.model_reporters.insert(name.into(), reporter);
        self
    }

    pub fn with_agent_reporter(mut self, name: impl Into<String>, reporter: AgentReporter) -> Self {
        self.agent_reporters.insert(name.into(), reporter);
        self
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn into_series(self) -> Series {
        self.series
    }

    /// Run every reporter against the world and append one row per reporter kind
    pub fn collect(&mut self, world: &mut World, step: u64) {
        let mut row = StepRecord::new(step);
        for (name, reporter) in &self.model_reporters {
            row.values.insert(name.clone(), reporter(world));
        }
        self.series.model_vars.push(row);

        if self.agent_reporters.is_empty() {
            return;
        }
        let mut agents: Vec<(AgentId, Entity)> = world
            .query::<(Entity, &AgentId)>()
            .iter(world)
            .map(|(e, id)| (*id, e))
            .collect();
        agents.sort_by_key(|(id, _)| *id);

        for (id, entity) in agents {
            let values: BTreeMap<String, f64> = self
                .agent_reporters
                .iter()
                .filter_map(|(name, reporter)| reporter(world, entity).map(|v| (name.clone(), v)))
                .collect();
            if !values.is_empty() {
                self.series.agent_vars.push(AgentRecord {
                    step,
                    agent_id: id.0,
                    values,
                });
            }
        }
    }
}

/// Collect the current step into the world's `DataCollector`, if it has one
pub fn collect_world(world: &mut World) {
    if !world.contains_resource::<DataCollector>() {
        return;
    }
    let step = world.get_resource::<StepClock>().map(|c| c.step).unwrap_or(0);
    world.resource_scope(|world, mut collector: Mut<DataCollector>| {
        collector.collect(world, step);
    });
}

/// Model reporter: number of agents in the world
pub fn count_agents(world: &mut World) -> f64 {
    world.query::<&AgentId>().iter(world).count() as f64
}
