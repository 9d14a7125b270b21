//! ECS Components
//!
//! Entity components for agents and their grid positions.

pub mod agent;
pub mod position;

pub use agent::*;
pub use position::*;
