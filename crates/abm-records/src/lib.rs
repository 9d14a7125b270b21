//! Shared record types and serialization for the agent-based models.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for the simulation crate and anything that reads its output.

pub mod report;
pub mod series;
pub mod snapshot;
pub mod trajectory;

// Re-export series types
pub use series::{AgentRecord, Series, StepRecord};

// Re-export snapshot types
pub use snapshot::{generate_snapshot_id, AgentSnapshot, CellSnapshot, GridSnapshot};

// Re-export trajectory types
pub use trajectory::{Trajectory, TrajectoryPoint};

// Re-export report types
pub use report::{RunMetadata, RunReport};
