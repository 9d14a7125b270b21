//! Spatially Constrained Growth
//!
//! Each agent, on its turn, looks at the empty cells around it and places one
//! clone of itself into one of them. Growth stops where the grid fills up.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::collector::{count_agents, DataCollector};
use crate::components::{Agent, AgentId, AgentIdAllocator, CloneId, GridPos};
use crate::config::GrowthConfig;
use crate::error::{SimError, SimResult};
use crate::schedule::{activation_order, SimRng, Simulation, StepClock};
use crate::space::{Occupancy, SpaceGrid};

pub const MODEL_NAME: &str = "growth";

/// Build a growth simulation with seed agents on distinct random cells
pub fn build(config: &GrowthConfig, seed: u64) -> SimResult<Simulation> {
    let mut grid = SpaceGrid::new(config.width, config.height, config.torus, Occupancy::Single)?;
    if config.initial_agents > grid.area() {
        return Err(SimError::InvalidParameter(format!(
            "{} initial agents do not fit on a {}x{} grid",
            config.initial_agents, config.width, config.height
        )));
    }

    let mut world = World::new();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut ids = AgentIdAllocator::new();

    let mut cells = grid.empty_cells();
    cells.shuffle(&mut rng);
    for pos in cells.into_iter().take(config.initial_agents) {
        let id = ids.next_id();
        let entity = world.spawn((Agent, id, CloneId(id.0), pos)).id();
        grid.place(entity, pos)?;
    }

    world.insert_resource(grid);
    world.insert_resource(ids);
    world.insert_resource(SimRng(rng));
    world.insert_resource(StepClock::new());
    world.insert_resource(DataCollector::new().with_model_reporter("population", count_agents));

    let mut schedule = Schedule::default();
    schedule.add_systems(grow);

    info!(
        width = config.width,
        height = config.height,
        initial_agents = config.initial_agents,
        "Growth model initialized"
    );
    Ok(Simulation::new(MODEL_NAME, seed, world, schedule))
}

/// System: every agent clones itself into one random empty neighboring cell
pub fn grow(
    mut commands: Commands,
    mut grid: ResMut<SpaceGrid>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<AgentIdAllocator>,
    agents: Query<(Entity, &AgentId, &CloneId, &GridPos)>,
) {
    let order = activation_order(agents.iter().map(|(e, id, _, _)| (e, id)), &mut rng.0);

    for entity in order {
        let Ok((_, _, clone_id, pos)) = agents.get(entity) else {
            continue;
        };
        let empty = grid.empty_neighbors(*pos);
        let Some(target) = empty.choose(&mut rng.0).copied() else {
            continue;
        };

        let child = commands.spawn((Agent, ids.next_id(), *clone_id, target)).id();
        // Claim the cell now so later agents this step see it taken
        if let Err(e) = grid.place(child, target) {
            warn!(error = %e, "Could not place clone");
            commands.entity(child).despawn();
        }
    }
}

/// Whether the grid has no empty cell left
pub fn is_saturated(world: &World) -> bool {
    world.resource::<SpaceGrid>().is_full()
}
