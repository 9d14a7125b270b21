//! Agent-based modeling workbench
//!
//! Small grid models (clone growth, Boltzmann wealth exchange, predation,
//! mutualism) built on a bevy ECS world, plus a Lotka-Volterra ODE solver
//! with time-series and phase-plot charts.

pub mod collector;
pub mod components;
pub mod config;
pub mod error;
pub mod models;
pub mod ode;
pub mod output;
pub mod plot;
pub mod schedule;
pub mod space;

pub use collector::DataCollector;
pub use config::Config;
pub use error::{SimError, SimResult};
pub use schedule::{SimRng, Simulation, StepClock};
pub use space::{Neighborhood, Occupancy, SpaceGrid};
