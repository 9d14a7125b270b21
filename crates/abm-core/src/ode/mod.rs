//! Ordinary Differential Equations
//!
//! A small ODE toolkit: systems describe their right-hand side, solvers
//! sample the solution at requested times.

pub mod lotka_volterra;
pub mod solver;
pub mod system;

pub use lotka_volterra::LotkaVolterra;
pub use solver::{integrate, Method};
pub use system::OdeSystem;
