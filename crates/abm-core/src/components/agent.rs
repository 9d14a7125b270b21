//! Agent Components
//!
//! Components for individual agents: identity, lineage, wealth, species, energy.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Marker component identifying an entity as an agent
#[derive(Component, Debug, Clone, Default)]
pub struct Agent;

/// Unique identifier for an agent, assigned in creation order
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Lineage identifier: offspring carry their founder's clone id
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloneId(pub u64);

/// Units of wealth held by an agent
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wealth(pub u64);

/// Stored energy of a predator. Zero or less means starvation.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Energy(pub i64);

/// Which population an agent belongs to
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Prey,
    Predator,
    Flower,
    Pollinator,
}

impl Species {
    /// The species whose presence helps this one reproduce, if any
    pub fn partner(self) -> Option<Species> {
        match self {
            Species::Flower => Some(Species::Pollinator),
            Species::Pollinator => Some(Species::Flower),
            Species::Prey | Species::Predator => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Species::Prey => "prey",
            Species::Predator => "wolf",
            Species::Flower => "flower",
            Species::Pollinator => "bee",
        }
    }
}

/// Resource handing out agent ids
#[derive(Resource, Debug, Default)]
pub struct AgentIdAllocator {
    next: u64,
}

impl AgentIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_sequential() {
        let mut ids = AgentIdAllocator::new();
        assert_eq!(ids.next_id(), AgentId(0));
        assert_eq!(ids.next_id(), AgentId(1));
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_partners_are_symmetric() {
        assert_eq!(Species::Flower.partner(), Some(Species::Pollinator));
        assert_eq!(Species::Pollinator.partner(), Some(Species::Flower));
        assert_eq!(Species::Prey.partner(), None);
    }
}
