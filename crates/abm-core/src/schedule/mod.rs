//! Scheduling
//!
//! Step clock, seeded randomness, random-order activation and the
//! `Simulation` runner that ties a world to its schedule.

pub mod activation;
pub mod clock;
pub mod runner;

pub use activation::activation_order;
pub use clock::StepClock;
pub use runner::Simulation;

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

/// Resource: the single random source of a model run
#[derive(Resource)]
pub struct SimRng(pub SmallRng);
