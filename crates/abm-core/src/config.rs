//! Configuration System
//!
//! Loads model parameters from tuning.toml for easy adjustment without recompiling.
//! Every field has a default, so a tuning file only needs the values it changes.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub growth: GrowthConfig,
    pub wealth: WealthConfig,
    pub predation: PredationConfig,
    pub mutualism: MutualismConfig,
    pub lotka_volterra: LotkaVolterraConfig,
    pub output: OutputConfig,
}

/// Run parameters shared by the grid models
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub steps: u64,
    /// Steps between grid snapshots; 0 disables periodic snapshots
    pub snapshot_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 20,
            snapshot_interval: 10,
        }
    }
}

/// Spatially constrained clone growth
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub width: usize,
    pub height: usize,
    pub initial_agents: usize,
    pub torus: bool,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            initial_agents: 5,
            torus: false,
        }
    }
}

/// Boltzmann wealth exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WealthConfig {
    pub agents: usize,
    pub width: usize,
    pub height: usize,
    pub initial_wealth: u64,
    pub torus: bool,
}

impl Default for WealthConfig {
    fn default() -> Self {
        Self {
            agents: 50,
            width: 10,
            height: 10,
            initial_wealth: 1,
            torus: true,
        }
    }
}

/// Grid predator-prey model
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredationConfig {
    pub width: usize,
    pub height: usize,
    pub initial_prey: usize,
    pub initial_predators: usize,
    /// Per-step probability that a prey reproduces
    pub prey_reproduce: f64,
    /// Per-step probability that a predator reproduces
    pub predator_reproduce: f64,
    /// Energy a predator gains from eating one prey
    pub predator_gain: i64,
}

impl Default for PredationConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            initial_prey: 100,
            initial_predators: 50,
            prey_reproduce: 0.04,
            predator_reproduce: 0.05,
            predator_gain: 20,
        }
    }
}

/// Grid mutualism model
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MutualismConfig {
    pub width: usize,
    pub height: usize,
    pub initial_flowers: usize,
    pub initial_pollinators: usize,
    /// Per-step reproduction probability without a partner nearby
    pub base_reproduce: f64,
    /// Added reproduction probability when a partner is nearby
    pub partner_bonus: f64,
    /// Per-step probability of death
    pub death_rate: f64,
    /// No births once the combined population reaches this size
    pub max_population: usize,
}

impl Default for MutualismConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            initial_flowers: 60,
            initial_pollinators: 30,
            base_reproduce: 0.02,
            partner_bonus: 0.06,
            death_rate: 0.05,
            max_population: 2000,
        }
    }
}

/// Numerical method used to integrate an ODE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Rk4,
    DormandPrince,
}

/// Lotka-Volterra parameters, initial populations and sampling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LotkaVolterraConfig {
    /// Prey growth rate
    pub alpha: f64,
    /// Predation rate
    pub beta: f64,
    /// Predator growth per prey eaten
    pub delta: f64,
    /// Predator death rate
    pub gamma: f64,
    pub initial_prey: f64,
    pub initial_predators: f64,
    pub t_end: f64,
    /// Number of evenly spaced sample times in [0, t_end]
    pub samples: usize,
    pub method: IntegratorKind,
    /// Step size for rk4
    pub dt: f64,
    pub rtol: f64,
    pub atol: f64,
}

impl Default for LotkaVolterraConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.1,
            delta: 0.075,
            gamma: 1.5,
            initial_prey: 10.0,
            initial_predators: 5.0,
            t_end: 15.0,
            samples: 1000,
            method: IntegratorKind::DormandPrince,
            dt: 0.001,
            rtol: 1e-8,
            atol: 1e-10,
        }
    }
}

/// Where results are written
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        if !Path::new(DEFAULT_TUNING_PATH).exists() {
            return Self::default();
        }
        Self::load(DEFAULT_TUNING_PATH).unwrap_or_else(|e| {
            warn!(error = %e, "Could not load {}, using defaults", DEFAULT_TUNING_PATH);
            Self::default()
        })
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
