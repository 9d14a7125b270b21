//! Boltzmann Wealth Exchange
//!
//! Agents wander a torus grid. After moving, an agent with any wealth hands
//! one unit to a random other agent sharing its cell. Total wealth is
//! conserved while its distribution grows unequal.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::collector::DataCollector;
use crate::components::{Agent, AgentId, AgentIdAllocator, GridPos, Wealth};
use crate::config::WealthConfig;
use crate::error::SimResult;
use crate::models::random_step;
use crate::schedule::{activation_order, SimRng, Simulation, StepClock};
use crate::space::{Occupancy, SpaceGrid};

pub const MODEL_NAME: &str = "wealth";

/// Build a wealth simulation with agents on uniformly random cells
pub fn build(config: &WealthConfig, seed: u64) -> SimResult<Simulation> {
    let mut grid = SpaceGrid::new(config.width, config.height, config.torus, Occupancy::Multi)?;
    let mut world = World::new();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut ids = AgentIdAllocator::new();

    for _ in 0..config.agents {
        let pos = grid.random_cell(&mut rng);
        let entity = world
            .spawn((Agent, ids.next_id(), Wealth(config.initial_wealth), pos))
            .id();
        grid.place(entity, pos)?;
    }

    world.insert_resource(grid);
    world.insert_resource(ids);
    world.insert_resource(SimRng(rng));
    world.insert_resource(StepClock::new());
    world.insert_resource(
        DataCollector::new()
            .with_model_reporter("total_wealth", total_wealth)
            .with_model_reporter("gini", gini_reporter)
            .with_agent_reporter("wealth", agent_wealth),
    );

    let mut schedule = Schedule::default();
    schedule.add_systems(move_and_exchange);

    info!(
        agents = config.agents,
        width = config.width,
        height = config.height,
        initial_wealth = config.initial_wealth,
        "Wealth model initialized"
    );
    Ok(Simulation::new(MODEL_NAME, seed, world, schedule))
}

/// System: each agent moves to a random neighboring cell, then gives away one unit
pub fn move_and_exchange(
    mut grid: ResMut<SpaceGrid>,
    mut rng: ResMut<SimRng>,
    mut agents: Query<(&AgentId, &mut GridPos, &mut Wealth)>,
    ids: Query<(Entity, &AgentId)>,
) {
    let order = activation_order(ids.iter(), &mut rng.0);

    for entity in order {
        let here = {
            let Ok((_, mut pos, _)) = agents.get_mut(entity) else {
                continue;
            };
            if let Err(e) = random_step(&mut grid, &mut rng.0, entity, &mut pos) {
                warn!(error = %e, "Move failed");
            }
            *pos
        };

        let has_wealth = agents.get(entity).map(|(_, _, w)| w.0 > 0).unwrap_or(false);
        if !has_wealth {
            continue;
        }

        let cellmates: Vec<Entity> = grid
            .cell(here)
            .iter()
            .copied()
            .filter(|e| *e != entity)
            .collect();
        let Some(other) = cellmates.choose(&mut rng.0).copied() else {
            continue;
        };

        if let Ok((_, _, mut wealth)) = agents.get_mut(entity) {
            wealth.0 -= 1;
        }
        if let Ok((_, _, mut wealth)) = agents.get_mut(other) {
            wealth.0 += 1;
        }
    }
}

/// Gini coefficient of a wealth distribution.
///
/// `G = sum_i sum_j |x_i - x_j| / (2 n sum x)`: 0 is perfect equality, values
/// near 1 mean one agent holds everything. Empty or all-zero input gives 0.
pub fn gini(values: &[u64]) -> f64 {
    let n = values.len();
    let total: u128 = values.iter().map(|v| u128::from(*v)).sum();
    if n == 0 || total == 0 {
        return 0.0;
    }

    // Sorted form of the pairwise sum: sum_i (2i - n + 1) x_(i)
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let weighted: i128 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (2 * i as i128 - n as i128 + 1) * i128::from(*x))
        .sum();

    weighted as f64 / (n as f64 * total as f64)
}

fn wealth_values(world: &mut World) -> Vec<u64> {
    world.query::<&Wealth>().iter(world).map(|w| w.0).collect()
}

/// Model reporter: Gini coefficient over all agents
pub fn gini_reporter(world: &mut World) -> f64 {
    gini(&wealth_values(world))
}

/// Model reporter: total wealth in the economy
pub fn total_wealth(world: &mut World) -> f64 {
    wealth_values(world).iter().sum::<u64>() as f64
}

/// Agent reporter: the agent's wealth
pub fn agent_wealth(world: &World, entity: Entity) -> Option<f64> {
    world.get::<Wealth>(entity).map(|w| w.0 as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_gini_extremes() {
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[0, 0, 0]), 0.0);
        assert!(approx(gini(&[5, 5, 5, 5]), 0.0));
        // One of n holds everything: (n - 1) / n
        assert!(approx(gini(&[0, 0, 0, 8]), 0.75));
    }

    #[test]
    fn test_gini_matches_pairwise_definition() {
        let values = [1u64, 3, 0, 7, 2, 2];
        let n = values.len() as f64;
        let total: f64 = values.iter().map(|v| *v as f64).sum();
        let mut pairwise = 0.0;
        for a in &values {
            for b in &values {
                pairwise += (*a as f64 - *b as f64).abs();
            }
        }
        assert!(approx(gini(&values), pairwise / (2.0 * n * total)));
    }

    #[test]
    fn test_wealth_is_conserved() {
        let config = WealthConfig::default();
        let mut sim = build(&config, 42).unwrap();
        sim.run(30);

        let totals = sim.series().column("total_wealth");
        assert_eq!(totals.len(), 31);
        assert!(totals.iter().all(|t| *t == 50.0));

        let world = sim.world_mut();
        let mut query = world.query::<&Wealth>();
        assert_eq!(query.iter(world).count(), 50);
    }

    #[test]
    fn test_inequality_emerges() {
        let mut sim = build(&WealthConfig::default(), 5).unwrap();
        assert_eq!(sim.series().last("gini"), Some(0.0));
        sim.run(100);
        assert!(sim.series().last("gini").unwrap() > 0.2);
    }

    #[test]
    fn test_agent_rows_every_step() {
        let config = WealthConfig {
            agents: 10,
            ..WealthConfig::default()
        };
        let mut sim = build(&config, 1).unwrap();
        sim.run(2);

        let series = sim.series();
        assert_eq!(series.agent_vars.len(), 30);
        assert_eq!(series.agents_at(2).len(), 10);
    }

    #[test]
    fn test_lone_agent_keeps_wealth() {
        let config = WealthConfig {
            agents: 1,
            initial_wealth: 3,
            ..WealthConfig::default()
        };
        let mut sim = build(&config, 9).unwrap();
        sim.run(10);
        assert_eq!(sim.series().last("total_wealth"), Some(3.0));
        assert_eq!(sim.series().last("gini"), Some(0.0));
    }
}
