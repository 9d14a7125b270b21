//! Step Clock

use bevy_ecs::prelude::*;

/// Resource: number of completed steps. Zero before the first step.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepClock {
    pub step: u64,
}

impl StepClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self) {
        self.step += 1;
    }
}
