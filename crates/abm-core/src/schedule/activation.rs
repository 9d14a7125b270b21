//! Random Activation
//!
//! Every step, agents act one at a time in a freshly shuffled order.

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::AgentId;

/// Shuffled activation order for the agents alive at the start of a step.
///
/// Agents are sorted by id before shuffling so the order depends only on the
/// RNG state, never on ECS storage layout. Agents spawned while the order is
/// being walked are not part of it and first act next step.
pub fn activation_order<'a, R>(
    agents: impl IntoIterator<Item = (Entity, &'a AgentId)>,
    rng: &mut R,
) -> Vec<Entity>
where
    R: Rng + ?Sized,
{
    let mut ordered: Vec<(AgentId, Entity)> = agents.into_iter().map(|(e, id)| (*id, e)).collect();
    ordered.sort_by_key(|(id, _)| *id);
    let mut order: Vec<Entity> = ordered.into_iter().map(|(_, e)| e).collect();
    order.shuffle(rng);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_order_is_a_permutation() {
        let mut world = World::new();
        for i in 0..20 {
            world.spawn(AgentId(i));
        }
        let mut query = world.query::<(Entity, &AgentId)>();
        let mut rng = SmallRng::seed_from_u64(1);

        let order = activation_order(query.iter(&world), &mut rng);
        assert_eq!(order.len(), 20);

        let mut sorted = order.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 20);
    }

    #[test]
    fn test_order_ignores_input_order() {
        let mut world = World::new();
        let pairs: Vec<(Entity, AgentId)> = (0..10)
            .map(|i| (world.spawn(AgentId(i)).id(), AgentId(i)))
            .collect();
        let reversed: Vec<(Entity, AgentId)> = pairs.iter().rev().cloned().collect();

        let a = activation_order(pairs.iter().map(|(e, id)| (*e, id)), &mut SmallRng::seed_from_u64(9));
        let b = activation_order(reversed.iter().map(|(e, id)| (*e, id)), &mut SmallRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
