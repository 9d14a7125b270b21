//! Position Component

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Component: an agent's cell on the grid.
///
/// Kept in step with the `SpaceGrid` index; move agents through the grid
/// helpers rather than writing this directly.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

impl GridPos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl From<(usize, usize)> for GridPos {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}
