//! Grid Predator-Prey
//!
//! Prey wander and breed. Predators wander, burn one unit of energy per step,
//! eat a prey sharing their cell, breed by splitting their energy, and starve
//! when the energy runs out.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::collector::DataCollector;
use crate::components::{Agent, AgentId, AgentIdAllocator, Energy, GridPos, Species};
use crate::config::PredationConfig;
use crate::error::{SimError, SimResult};
use crate::models::{count_species, random_step};
use crate::schedule::{activation_order, SimRng, Simulation, StepClock};
use crate::space::{Occupancy, SpaceGrid};

pub const MODEL_NAME: &str = "predation";

/// Resource: per-step behavior parameters
#[derive(Resource, Debug, Clone)]
pub struct PredationRules {
    pub prey_reproduce: f64,
    pub predator_reproduce: f64,
    pub predator_gain: i64,
}

impl From<&PredationConfig> for PredationRules {
    fn from(config: &PredationConfig) -> Self {
        Self {
            prey_reproduce: config.prey_reproduce,
            predator_reproduce: config.predator_reproduce,
            predator_gain: config.predator_gain,
        }
    }
}

fn check_probability(name: &str, p: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::InvalidParameter(format!("{} must be in [0, 1], got {}", name, p)))
    }
}

/// Build a predator-prey simulation. Predators start with random energy in
/// [1, 2 * predator_gain].
pub fn build(config: &PredationConfig, seed: u64) -> SimResult<Simulation> {
    check_probability("prey_reproduce", config.prey_reproduce)?;
    check_probability("predator_reproduce", config.predator_reproduce)?;
    if config.predator_gain <= 0 {
        return Err(SimError::InvalidParameter(format!(
            "predator_gain must be positive, got {}",
            config.predator_gain
        )));
    }

    let mut grid = SpaceGrid::new(config.width, config.height, true, Occupancy::Multi)?;
    let mut world = World::new();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut ids = AgentIdAllocator::new();

    for _ in 0..config.initial_prey {
        let pos = grid.random_cell(&mut rng);
        let entity = world.spawn((Agent, ids.next_id(), Species::Prey, pos)).id();
        grid.place(entity, pos)?;
    }
    for _ in 0..config.initial_predators {
        let pos = grid.random_cell(&mut rng);
        let energy = Energy(rng.gen_range(1..=2 * config.predator_gain));
        let entity = world
            .spawn((Agent, ids.next_id(), Species::Predator, energy, pos))
            .id();
        grid.place(entity, pos)?;
    }

    world.insert_resource(grid);
    world.insert_resource(ids);
    world.insert_resource(SimRng(rng));
    world.insert_resource(StepClock::new());
    world.insert_resource(PredationRules::from(config));
    world.insert_resource(
        DataCollector::new()
            .with_model_reporter("prey", count_prey)
            .with_model_reporter("predators", count_predators),
    );

    let mut schedule = Schedule::default();
    schedule.add_systems(hunt);

    info!(
        prey = config.initial_prey,
        predators = config.initial_predators,
        "Predation model initialized"
    );
    Ok(Simulation::new(MODEL_NAME, seed, world, schedule))
}

/// System: move, feed, starve and breed every agent once, in random order
pub fn hunt(
    mut commands: Commands,
    mut grid: ResMut<SpaceGrid>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<AgentIdAllocator>,
    rules: Res<PredationRules>,
    mut agents: Query<(&Species, &mut GridPos, Option<&mut Energy>)>,
    roster: Query<(Entity, &AgentId)>,
) {
    let order = activation_order(roster.iter(), &mut rng.0);
    let mut dead: HashSet<Entity> = HashSet::new();

    for entity in order {
        if dead.contains(&entity) {
            continue;
        }
        let (species, here) = {
            let Ok((species, mut pos, _)) = agents.get_mut(entity) else {
                continue;
            };
            if let Err(e) = random_step(&mut grid, &mut rng.0, entity, &mut pos) {
                warn!(error = %e, "Move failed");
            }
            (*species, *pos)
        };

        match species {
            Species::Prey => {
                if rng.0.gen_bool(rules.prey_reproduce) {
                    let child = commands.spawn((Agent, ids.next_id(), Species::Prey, here)).id();
                    if let Err(e) = grid.place(child, here) {
                        warn!(error = %e, "Could not place newborn prey");
                        commands.entity(child).despawn();
                    }
                }
            }
            Species::Predator => {
                let prey: Vec<Entity> = grid
                    .cell(here)
                    .iter()
                    .copied()
                    .filter(|e| !dead.contains(e))
                    .filter(|e| matches!(agents.get(*e), Ok((Species::Prey, _, _))))
                    .collect();
                let meal = prey.choose(&mut rng.0).copied();
                if let Some(victim) = meal {
                    dead.insert(victim);
                    if let Err(e) = grid.remove(victim, here) {
                        warn!(error = %e, "Eaten prey was not on the grid");
                    }
                    commands.entity(victim).despawn();
                }

                let Ok((_, _, Some(mut energy))) = agents.get_mut(entity) else {
                    continue;
                };
                energy.0 -= 1;
                if meal.is_some() {
                    energy.0 += rules.predator_gain;
                }

                if energy.0 <= 0 {
                    dead.insert(entity);
                    if let Err(e) = grid.remove(entity, here) {
                        warn!(error = %e, "Starved predator was not on the grid");
                    }
                    commands.entity(entity).despawn();
                    continue;
                }

                if energy.0 >= 2 && rng.0.gen_bool(rules.predator_reproduce) {
                    let share = energy.0 / 2;
                    energy.0 -= share;
                    let child = commands
                        .spawn((Agent, ids.next_id(), Species::Predator, Energy(share), here))
                        .id();
                    if let Err(e) = grid.place(child, here) {
                        warn!(error = %e, "Could not place newborn predator");
                        commands.entity(child).despawn();
                    }
                }
            }
            Species::Flower | Species::Pollinator => {}
        }
    }
}

/// Model reporter: live prey
pub fn count_prey(world: &mut World) -> f64 {
    count_species(world, Species::Prey)
}

/// Model reporter: live predators
pub fn count_predators(world: &mut World) -> f64 {
    count_species(world, Species::Predator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PredationConfig {
        PredationConfig {
            width: 10,
            height: 10,
            initial_prey: 40,
            initial_predators: 10,
            ..PredationConfig::default()
        }
    }

    #[test]
    fn test_initial_counts() {
        let sim = build(&config(), 42).unwrap();
        let series = sim.series();
        assert_eq!(series.last("prey"), Some(40.0));
        assert_eq!(series.last("predators"), Some(10.0));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let bad = PredationConfig {
            prey_reproduce: 1.5,
            ..config()
        };
        assert!(matches!(build(&bad, 1), Err(SimError::InvalidParameter(_))));
    }

    #[test]
    fn test_predators_starve_without_prey() {
        let lonely = PredationConfig {
            initial_prey: 0,
            initial_predators: 5,
            predator_gain: 2,
            predator_reproduce: 0.0,
            ..config()
        };
        let mut sim = build(&lonely, 3).unwrap();
        // Energy starts at most 2 * gain = 4
        sim.run(4);
        assert_eq!(sim.series().last("predators"), Some(0.0));
        assert_eq!(sim.world().resource::<SpaceGrid>().population(), 0);
    }

    #[test]
    fn test_prey_only_grows() {
        let prey_only = PredationConfig {
            initial_prey: 20,
            initial_predators: 0,
            prey_reproduce: 0.5,
            ..config()
        };
        let mut sim = build(&prey_only, 8).unwrap();
        sim.run(5);

        let prey = sim.series().column("prey");
        assert!(prey.windows(2).all(|w| w[0] <= w[1]));
        assert!(*prey.last().unwrap() > 20.0);
    }

    #[test]
    fn test_grid_matches_population() {
        let mut sim = build(&config(), 17).unwrap();
        sim.run(15);

        let series = sim.series();
        let alive = series.last("prey").unwrap() + series.last("predators").unwrap();
        assert_eq!(sim.world().resource::<SpaceGrid>().population() as f64, alive);

        let world = sim.world_mut();
        let mut query = world.query::<(Entity, &GridPos)>();
        let positions: Vec<(Entity, GridPos)> = query.iter(world).map(|(e, p)| (e, *p)).collect();
        let grid = world.resource::<SpaceGrid>();
        for (entity, pos) in positions {
            assert!(grid.cell(pos).contains(&entity));
        }
    }
}
