//! Grid Mutualism
//!
//! Flowers are rooted, pollinators wander. Either species breeds more often
//! with a partner of the other species in its Moore neighborhood, and both
//! die at a fixed per-step rate.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::collector::DataCollector;
use crate::components::{Agent, AgentId, AgentIdAllocator, GridPos, Species};
use crate::config::MutualismConfig;
use crate::error::{SimError, SimResult};
use crate::models::{count_species, random_step};
use crate::schedule::{activation_order, SimRng, Simulation, StepClock};
use crate::space::{Neighborhood, Occupancy, SpaceGrid};

pub const MODEL_NAME: &str = "mutualism";

/// Resource: per-step behavior parameters
#[derive(Resource, Debug, Clone)]
pub struct MutualismRules {
    pub base_reproduce: f64,
    pub partner_bonus: f64,
    pub death_rate: f64,
    pub max_population: usize,
}

impl MutualismRules {
    /// Reproduction probability for an agent with or without a partner nearby
    pub fn reproduce_chance(&self, partnered: bool) -> f64 {
        let p = if partnered {
            self.base_reproduce + self.partner_bonus
        } else {
            self.base_reproduce
        };
        p.clamp(0.0, 1.0)
    }
}

impl From<&MutualismConfig> for MutualismRules {
    fn from(config: &MutualismConfig) -> Self {
        Self {
            base_reproduce: config.base_reproduce,
            partner_bonus: config.partner_bonus,
            death_rate: config.death_rate,
            max_population: config.max_population,
        }
    }
}

pub fn build(config: &MutualismConfig, seed: u64) -> SimResult<Simulation> {
    for (name, p) in [
        ("base_reproduce", config.base_reproduce),
        ("partner_bonus", config.partner_bonus),
        ("death_rate", config.death_rate),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(SimError::InvalidParameter(format!(
                "{} must be in [0, 1], got {}",
                name, p
            )));
        }
    }

    let mut grid = SpaceGrid::new(config.width, config.height, true, Occupancy::Multi)?;
    let mut world = World::new();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut ids = AgentIdAllocator::new();

    let founders = std::iter::repeat(Species::Flower)
        .take(config.initial_flowers)
        .chain(std::iter::repeat(Species::Pollinator).take(config.initial_pollinators));
    for species in founders {
        let pos = grid.random_cell(&mut rng);
        let entity = world.spawn((Agent, ids.next_id(), species, pos)).id();
        grid.place(entity, pos)?;
    }

    world.insert_resource(grid);
    world.insert_resource(ids);
    world.insert_resource(SimRng(rng));
    world.insert_resource(StepClock::new());
    world.insert_resource(MutualismRules::from(config));
    world.insert_resource(
        DataCollector::new()
            .with_model_reporter("flowers", count_flowers)
            .with_model_reporter("pollinators", count_pollinators),
    );

    let mut schedule = Schedule::default();
    schedule.add_systems(live_and_breed);

    info!(
        flowers = config.initial_flowers,
        pollinators = config.initial_pollinators,
        "Mutualism model initialized"
    );
    Ok(Simulation::new(MODEL_NAME, seed, world, schedule))
}

/// System: pollinators move; then every agent may die, or else may breed
pub fn live_and_breed(
    mut commands: Commands,
    mut grid: ResMut<SpaceGrid>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<AgentIdAllocator>,
    rules: Res<MutualismRules>,
    mut agents: Query<(&Species, &mut GridPos)>,
    roster: Query<(Entity, &AgentId)>,
) {
    let order = activation_order(roster.iter(), &mut rng.0);
    let mut population = order.len();
    let mut dead: HashSet<Entity> = HashSet::new();

    for entity in order {
        let (species, here) = {
            let Ok((species, mut pos)) = agents.get_mut(entity) else {
                continue;
            };
            if *species == Species::Pollinator {
                if let Err(e) = random_step(&mut grid, &mut rng.0, entity, &mut pos) {
                    warn!(error = %e, "Move failed");
                }
            }
            (*species, *pos)
        };

        if rng.0.gen_bool(rules.death_rate) {
            dead.insert(entity);
            if let Err(e) = grid.remove(entity, here) {
                warn!(error = %e, "Dying agent was not on the grid");
            }
            commands.entity(entity).despawn();
            population -= 1;
            continue;
        }

        let partnered = species.partner().is_some_and(|partner| {
            grid.neighbors(here, Neighborhood::Moore, true, 1)
                .into_iter()
                .filter(|e| !dead.contains(e))
                .any(|e| matches!(agents.get(e), Ok((s, _)) if *s == partner))
        });
        if population >= rules.max_population || !rng.0.gen_bool(rules.reproduce_chance(partnered)) {
            continue;
        }

        // Flowers seed a neighboring cell, pollinators raise young where they stand
        let birthplace = match species {
            Species::Flower => grid
                .neighborhood(here, Neighborhood::Moore, false, 1)
                .choose(&mut rng.0)
                .copied()
                .unwrap_or(here),
            _ => here,
        };
        let child = commands.spawn((Agent, ids.next_id(), species, birthplace)).id();
        match grid.place(child, birthplace) {
            Ok(()) => population += 1,
            Err(e) => {
                warn!(error = %e, "Could not place offspring");
                commands.entity(child).despawn();
            }
        }
    }
}

/// Model reporter: live flowers
pub fn count_flowers(world: &mut World) -> f64 {
    count_species(world, Species::Flower)
}

/// Model reporter: live pollinators
pub fn count_pollinators(world: &mut World) -> f64 {
    count_species(world, Species::Pollinator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> MutualismRules {
        MutualismRules::from(&MutualismConfig::default())
    }

    #[test]
    fn test_partner_raises_reproduction() {
        let rules = rules();
        assert!(rules.reproduce_chance(true) > rules.reproduce_chance(false));

        let capped = MutualismRules {
            base_reproduce: 0.8,
            partner_bonus: 0.8,
            ..rules
        };
        assert_eq!(capped.reproduce_chance(true), 1.0);
    }

    #[test]
    fn test_rejects_bad_rates() {
        let bad = MutualismConfig {
            death_rate: -0.1,
            ..MutualismConfig::default()
        };
        assert!(matches!(build(&bad, 0), Err(SimError::InvalidParameter(_))));
    }

    #[test]
    fn test_everything_dies_at_full_death_rate() {
        let config = MutualismConfig {
            death_rate: 1.0,
            ..MutualismConfig::default()
        };
        let mut sim = build(&config, 4).unwrap();
        sim.step();
        assert_eq!(sim.series().last("flowers"), Some(0.0));
        assert_eq!(sim.series().last("pollinators"), Some(0.0));
        assert_eq!(sim.world().resource::<SpaceGrid>().population(), 0);
    }

    #[test]
    fn test_population_cap_holds() {
        let config = MutualismConfig {
            base_reproduce: 1.0,
            death_rate: 0.0,
            max_population: 150,
            ..MutualismConfig::default()
        };
        let mut sim = build(&config, 2).unwrap();
        sim.run(5);

        let series = sim.series();
        let total = series.last("flowers").unwrap() + series.last("pollinators").unwrap();
        assert_eq!(total, 150.0);
    }

    #[test]
    fn test_flowers_stay_put() {
        let config = MutualismConfig {
            initial_pollinators: 0,
            base_reproduce: 0.0,
            partner_bonus: 0.0,
            death_rate: 0.0,
            ..MutualismConfig::default()
        };
        let mut sim = build(&config, 6).unwrap();
        let before: Vec<GridPos> = {
            let world = sim.world_mut();
            let mut query = world.query::<(&AgentId, &GridPos)>();
            let mut rows: Vec<_> = query.iter(world).map(|(id, p)| (*id, *p)).collect();
            rows.sort_by_key(|(id, _)| *id);
            rows.into_iter().map(|(_, p)| p).collect()
        };
        sim.run(3);
        let world = sim.world_mut();
        let mut query = world.query::<(&AgentId, &GridPos)>();
        let mut rows: Vec<_> = query.iter(world).map(|(id, p)| (*id, *p)).collect();
        rows.sort_by_key(|(id, _)| *id);
        let after: Vec<GridPos> = rows.into_iter().map(|(_, p)| p).collect();
        assert_eq!(before, after);
    }
}
