//! Snapshot Generation
//!
//! Captures the occupied cells of a grid model at regular intervals.

use abm_records::{generate_snapshot_id, AgentSnapshot, CellSnapshot, GridSnapshot};
use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::components::{AgentId, CloneId, Energy, GridPos, Species, Wealth};
use crate::schedule::StepClock;
use crate::space::SpaceGrid;

/// Tracks snapshot numbering and cadence
#[derive(Debug)]
pub struct SnapshotGenerator {
    next_snapshot_id: u64,
    snapshot_interval: u64,
}

impl SnapshotGenerator {
    /// `snapshot_interval` of 0 means only explicitly requested snapshots
    pub fn new(snapshot_interval: u64) -> Self {
        Self {
            next_snapshot_id: 1,
            snapshot_interval,
        }
    }

    pub fn should_snapshot(&self, step: u64) -> bool {
        self.snapshot_interval > 0 && step > 0 && step % self.snapshot_interval == 0
    }

    pub fn next_id(&mut self) -> String {
        let id = generate_snapshot_id(self.next_snapshot_id);
        self.next_snapshot_id += 1;
        id
    }

    pub fn snapshot_count(&self) -> u64 {
        self.next_snapshot_id - 1
    }
}

fn kind_of(species: Option<&Species>, clone_id: Option<&CloneId>) -> &'static str {
    match (species, clone_id) {
        (Some(s), _) => s.label(),
        (None, Some(_)) => "cell",
        (None, None) => "agent",
    }
}

/// Snapshot every agent on the world's grid. Returns None when the world has no grid.
pub fn generate_snapshot(
    world: &mut World,
    model: &str,
    triggered_by: &str,
    generator: &mut SnapshotGenerator,
) -> Option<GridSnapshot> {
    let (width, height) = {
        let grid = world.get_resource::<SpaceGrid>()?;
        (grid.width(), grid.height())
    };
    let step = world.get_resource::<StepClock>().map(|c| c.step).unwrap_or(0);

    let mut query = world.query::<(
        &AgentId,
        &GridPos,
        Option<&Species>,
        Option<&CloneId>,
        Option<&Wealth>,
        Option<&Energy>,
    )>();

    let mut by_cell: HashMap<GridPos, Vec<AgentSnapshot>> = HashMap::new();
    for (id, pos, species, clone_id, wealth, energy) in query.iter(world) {
        let mut attributes = BTreeMap::new();
        if let Some(c) = clone_id {
            attributes.insert("clone_id".to_string(), c.0 as f64);
        }
        if let Some(w) = wealth {
            attributes.insert("wealth".to_string(), w.0 as f64);
        }
        if let Some(e) = energy {
            attributes.insert("energy".to_string(), e.0 as f64);
        }
        by_cell.entry(*pos).or_default().push(AgentSnapshot {
            agent_id: id.0,
            kind: kind_of(species, clone_id).to_string(),
            attributes,
        });
    }

    let mut cells: Vec<CellSnapshot> = by_cell
        .into_iter()
        .map(|(pos, mut agents)| {
            agents.sort_by_key(|a| a.agent_id);
            CellSnapshot {
                x: pos.x,
                y: pos.y,
                agents,
            }
        })
        .collect();
    cells.sort_by_key(|c| (c.y, c.x));

    Some(GridSnapshot {
        snapshot_id: generator.next_id(),
        model: model.to_string(),
        step,
        triggered_by: triggered_by.to_string(),
        width,
        height,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Occupancy;

    #[test]
    fn test_generator_cadence() {
        let mut generator = SnapshotGenerator::new(10);
        assert!(!generator.should_snapshot(0));
        assert!(!generator.should_snapshot(5));
        assert!(generator.should_snapshot(10));
        assert!(generator.should_snapshot(20));
        assert!(!SnapshotGenerator::new(0).should_snapshot(10));

        assert_eq!(generator.next_id(), "snap_000001");
        assert_eq!(generator.snapshot_count(), 1);
    }

    #[test]
    fn test_snapshot_contents() {
        let mut world = World::new();
        let mut grid = SpaceGrid::new(4, 3, false, Occupancy::Multi).unwrap();
        let pos = GridPos::new(1, 2);
        let a = world.spawn((AgentId(3), pos, Wealth(7))).id();
        let b = world.spawn((AgentId(1), pos, Species::Predator, Energy(5))).id();
        grid.place(a, pos).unwrap();
        grid.place(b, pos).unwrap();
        world.insert_resource(grid);
        world.insert_resource(StepClock { step: 12 });

        let mut generator = SnapshotGenerator::new(10);
        let snapshot = generate_snapshot(&mut world, "test", "periodic", &mut generator).unwrap();

        assert_eq!(snapshot.step, 12);
        assert_eq!((snapshot.width, snapshot.height), (4, 3));
        assert_eq!(snapshot.agent_count(), 2);
        let agents = snapshot.agents_at(1, 2);
        assert_eq!(agents[0].agent_id, 1);
        assert_eq!(agents[0].kind, "wolf");
        assert_eq!(agents[0].attributes["energy"], 5.0);
        assert_eq!(agents[1].kind, "agent");
        assert_eq!(agents[1].attributes["wealth"], 7.0);
    }

    #[test]
    fn test_no_grid_no_snapshot() {
        let mut world = World::new();
        let mut generator = SnapshotGenerator::new(1);
        assert!(generate_snapshot(&mut world, "ode", "manual", &mut generator).is_none());
        assert_eq!(generator.snapshot_count(), 0);
    }
}
