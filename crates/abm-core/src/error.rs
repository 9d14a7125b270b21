//! Error Types

use thiserror::Error;

use crate::components::GridPos;

/// Errors raised by the grid, the models and the integrators
#[derive(Debug, Error)]
pub enum SimError {
    #[error("position ({x}, {y}) is outside a {width}x{height} grid")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    #[error("cell {0:?} is already occupied")]
    CellOccupied(GridPos),

    #[error("agent is not on the grid at {0:?}")]
    AgentNotOnGrid(GridPos),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("integration diverged at t = {t}")]
    Diverged { t: f64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("plot error: {0}")]
    Plot(String),
}

pub type SimResult<T> = Result<T, SimError>;
