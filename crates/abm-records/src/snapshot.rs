//! Snapshot Types
//!
//! Serialization structs for grid snapshots.
//!
//! A snapshot captures every occupied cell of a grid model at one step,
//! used for inspection and for the ASCII rendering printed by the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// One agent inside a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: u64,
    /// Short kind label, e.g. "cell", "prey", "predator"
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, f64>,
}

/// One occupied cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub x: usize,
    pub y: usize,
    pub agents: Vec<AgentSnapshot>,
}

/// Complete grid state at one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub snapshot_id: String,
    pub model: String,
    pub step: u64,
    pub triggered_by: String,
    pub width: usize,
    pub height: usize,
    /// Occupied cells only, in row-major order
    pub cells: Vec<CellSnapshot>,
}

impl GridSnapshot {
    /// Total number of agents across all cells
    pub fn agent_count(&self) -> usize {
        self.cells.iter().map(|c| c.agents.len()).sum()
    }

    /// Agents in a given cell, empty if the cell is unoccupied
    pub fn agents_at(&self, x: usize, y: usize) -> &[AgentSnapshot] {
        self.cells
            .iter()
            .find(|c| c.x == x && c.y == y)
            .map(|c| c.agents.as_slice())
            .unwrap_or(&[])
    }

    /// Render the grid as text, top row first.
    ///
    /// Empty cells are '.', cells with one agent show the first letter of its
    /// kind, and crowded cells show the count (capped at 9, '+' above that).
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let agents = self.agents_at(x, y);
                let glyph = match agents.len() {
                    0 => '.',
                    1 => agents[0].kind.chars().next().unwrap_or('#'),
                    n if n <= 9 => char::from_digit(n as u32, 10).unwrap_or('+'),
                    _ => '+',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}
