//! Models
//!
//! World setup and step systems for each agent-based model.

pub mod growth;
pub mod mutualism;
pub mod predation;
pub mod wealth;

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::{GridPos, Species};
use crate::error::SimResult;
use crate::space::{Neighborhood, SpaceGrid};

/// Move an agent to a random cell of its Moore neighborhood.
///
/// Cells without room are skipped; an agent with nowhere to go stays put.
pub fn random_step<R: Rng + ?Sized>(
    grid: &mut SpaceGrid,
    rng: &mut R,
    entity: Entity,
    pos: &mut GridPos,
) -> SimResult<()> {
    let options: Vec<GridPos> = grid
        .neighborhood(*pos, Neighborhood::Moore, false, 1)
        .into_iter()
        .filter(|p| grid.has_room(*p))
        .collect();
    let Some(target) = options.choose(rng).copied() else {
        return Ok(());
    };
    grid.move_agent(entity, *pos, target)?;
    *pos = target;
    Ok(())
}

/// Number of live agents of one species
pub fn count_species(world: &mut World, species: Species) -> f64 {
    world
        .query::<&Species>()
        .iter(world)
        .filter(|s| **s == species)
        .count() as f64
}
