//! Lotka-Volterra Predator-Prey Equations
//!
//! dx/dt = alpha x - beta x y
//! dy/dt = delta x y - gamma y
//!
//! where x is the prey population and y the predator population.

use abm_records::Trajectory;
use tracing::info;

use crate::config::{IntegratorKind, LotkaVolterraConfig};
use crate::error::{SimError, SimResult};
use crate::ode::solver::{integrate, linspace, Method};
use crate::ode::OdeSystem;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotkaVolterra {
    /// Prey growth rate
    pub alpha: f64,
    /// Rate at which predators remove prey
    pub beta: f64,
    /// Predator growth per prey consumed
    pub delta: f64,
    /// Predator death rate
    pub gamma: f64,
}

impl LotkaVolterra {
    pub fn new(alpha: f64, beta: f64, delta: f64, gamma: f64) -> SimResult<Self> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("delta", delta), ("gamma", gamma)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidParameter(format!(
                    "{} must be a positive rate, got {}",
                    name, value
                )));
            }
        }
        Ok(Self {
            alpha,
            beta,
            delta,
            gamma,
        })
    }

    pub fn from_config(config: &LotkaVolterraConfig) -> SimResult<Self> {
        Self::new(config.alpha, config.beta, config.delta, config.gamma)
    }

    /// Validated initial state [prey, predators]
    pub fn initial_state(&self, prey: f64, predators: f64) -> SimResult<Vec<f64>> {
        if !(prey.is_finite() && predators.is_finite()) || prey < 0.0 || predators < 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "populations must be non-negative, got prey = {}, predators = {}",
                prey, predators
            )));
        }
        Ok(vec![prey, predators])
    }

    /// Coexistence equilibrium (gamma / delta, alpha / beta)
    pub fn equilibrium(&self) -> (f64, f64) {
        (self.gamma / self.delta, self.alpha / self.beta)
    }

    /// V = delta x - gamma ln x + beta y - alpha ln y, constant along exact
    /// solutions. Undefined unless both populations are positive.
    pub fn conserved_quantity(&self, state: &[f64]) -> Option<f64> {
        let (x, y) = (*state.first()?, *state.get(1)?);
        if x <= 0.0 || y <= 0.0 {
            return None;
        }
        Some(self.delta * x - self.gamma * x.ln() + self.beta * y - self.alpha * y.ln())
    }
}

impl OdeSystem for LotkaVolterra {
    fn dimension(&self) -> usize {
        2
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (prey, predators) = (y[0], y[1]);
        dydt[0] = self.alpha * prey - self.beta * prey * predators;
        dydt[1] = self.delta * prey * predators - self.gamma * predators;
    }

    fn labels(&self) -> Vec<String> {
        vec!["prey".to_string(), "predators".to_string()]
    }
}

impl From<&LotkaVolterraConfig> for Method {
    fn from(config: &LotkaVolterraConfig) -> Self {
        match config.method {
            IntegratorKind::Rk4 => Method::Rk4 { dt: config.dt },
            IntegratorKind::DormandPrince => Method::DormandPrince {
                rtol: config.rtol,
                atol: config.atol,
            },
        }
    }
}

/// Solve the configured system on `samples` evenly spaced times in [0, t_end]
pub fn solve(config: &LotkaVolterraConfig) -> SimResult<Trajectory> {
    if !(config.t_end.is_finite() && config.t_end > 0.0) || config.samples < 2 {
        return Err(SimError::InvalidParameter(format!(
            "need t_end > 0 and at least 2 samples, got t_end = {}, samples = {}",
            config.t_end, config.samples
        )));
    }
    let system = LotkaVolterra::from_config(config)?;
    let y0 = system.initial_state(config.initial_prey, config.initial_predators)?;
    let times = linspace(0.0, config.t_end, config.samples);

    let trajectory = integrate(&system, Method::from(config), &y0, &times)?;
    if let Some(last) = trajectory.last() {
        info!(
            t = last.t,
            prey = last.state[0],
            predators = last.state[1],
            "Lotka-Volterra solved"
        );
    }
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> LotkaVolterra {
        LotkaVolterra::new(1.0, 0.1, 0.075, 1.5).unwrap()
    }

    #[test]
    fn test_rhs_values() {
        let lv = classic();
        let mut dydt = [0.0; 2];
        lv.rhs(0.0, &[10.0, 5.0], &mut dydt);
        assert!((dydt[0] - 5.0).abs() < 1e-12);
        assert!((dydt[1] - (3.75 - 7.5)).abs() < 1e-12);
    }

    #[test]
    fn test_equilibrium_is_stationary() {
        let lv = classic();
        let (x, y) = lv.equilibrium();
        let mut dydt = [1.0; 2];
        lv.rhs(0.0, &[x, y], &mut dydt);
        assert!(dydt[0].abs() < 1e-9);
        assert!(dydt[1].abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(LotkaVolterra::new(1.0, -0.1, 0.075, 1.5).is_err());
        assert!(LotkaVolterra::new(f64::NAN, 0.1, 0.075, 1.5).is_err());
        assert!(matches!(
            classic().initial_state(-1.0, 5.0),
            Err(SimError::InvalidParameter(_))
        ));
        assert!(classic().initial_state(0.0, 5.0).is_ok());
    }

    #[test]
    fn test_solve_default_config() {
        let config = LotkaVolterraConfig {
            samples: 151,
            ..LotkaVolterraConfig::default()
        };
        let traj = solve(&config).unwrap();
        assert_eq!(traj.len(), 151);
        assert_eq!(traj.labels, vec!["prey".to_string(), "predators".to_string()]);
        assert_eq!(traj.points[0].state, vec![10.0, 5.0]);
        assert!((traj.last().unwrap().t - 15.0).abs() < 1e-12);

        // Populations oscillate but stay positive
        assert!(traj.points.iter().all(|p| p.state[0] > 0.0 && p.state[1] > 0.0));
        let prey = traj.component(0);
        let max = prey.iter().cloned().fold(f64::MIN, f64::max);
        assert!(max > 30.0);
    }

    #[test]
    fn test_solve_rejects_bad_config() {
        let negative = LotkaVolterraConfig {
            initial_predators: -2.0,
            ..LotkaVolterraConfig::default()
        };
        assert!(matches!(solve(&negative), Err(SimError::InvalidParameter(_))));

        let no_span = LotkaVolterraConfig {
            t_end: 0.0,
            ..LotkaVolterraConfig::default()
        };
        assert!(solve(&no_span).is_err());
    }

    #[test]
    fn test_conserved_quantity_needs_positive_state() {
        let lv = classic();
        assert!(lv.conserved_quantity(&[10.0, 5.0]).is_some());
        assert!(lv.conserved_quantity(&[0.0, 5.0]).is_none());
        assert!(lv.conserved_quantity(&[10.0]).is_none());
    }
}
