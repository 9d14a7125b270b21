//! ODE Solvers
//!
//! `integrate` returns the solution at each requested time, starting from the
//! initial state at the first one. Two methods are available: classic
//! fixed-step RK4 and adaptive Dormand-Prince 5(4).

use abm_records::Trajectory;
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::ode::OdeSystem;

/// Upper bound on internal steps between two consecutive sample times
const MAX_STEPS_PER_INTERVAL: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    /// Classic fourth-order Runge-Kutta with a fixed step
    Rk4 { dt: f64 },
    /// Adaptive Dormand-Prince 5(4) with mixed error tolerance
    DormandPrince { rtol: f64, atol: f64 },
}

impl Method {
    fn validate(&self) -> SimResult<()> {
        let ok = match *self {
            Method::Rk4 { dt } => dt.is_finite() && dt > 0.0,
            Method::DormandPrince { rtol, atol } => {
                rtol.is_finite() && atol.is_finite() && rtol > 0.0 && atol > 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(SimError::InvalidParameter(format!("bad solver settings: {:?}", self)))
        }
    }
}

/// `samples` evenly spaced times from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Solve `system` from `y0` at `times[0]` and sample it at every entry of `times`.
pub fn integrate<S: OdeSystem + ?Sized>(
    system: &S,
    method: Method,
    y0: &[f64],
    times: &[f64],
) -> SimResult<Trajectory> {
    method.validate()?;
    if y0.len() != system.dimension() {
        return Err(SimError::InvalidParameter(format!(
            "initial state has {} components, system has {}",
            y0.len(),
            system.dimension()
        )));
    }
    let Some(&t0) = times.first() else {
        return Err(SimError::InvalidParameter("no sample times".to_string()));
    };
    if times.iter().any(|t| !t.is_finite()) || times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SimError::InvalidParameter(
            "sample times must be finite and strictly increasing".to_string(),
        ));
    }
    check_finite(y0, t0)?;

    let mut trajectory = Trajectory::new(system.labels());
    trajectory.push(t0, y0.to_vec());

    let mut t = t0;
    let mut y = y0.to_vec();
    let mut stepper = Stepper::new(system, method, t0, &y, times[times.len() - 1] - t0);

    for &target in &times[1..] {
        stepper.advance(&mut t, &mut y, target)?;
        trajectory.push(target, y.clone());
    }

    debug!(
        samples = trajectory.len(),
        internal_steps = stepper.steps,
        rejected = stepper.rejected,
        "Integration finished"
    );
    Ok(trajectory)
}

fn check_finite(y: &[f64], t: f64) -> SimResult<()> {
    if y.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SimError::Diverged { t })
    }
}

/// Scratch space and step-size state shared across sample intervals
struct Stepper<'a, S: OdeSystem + ?Sized> {
    system: &'a S,
    method: Method,
    /// Proposed next step for the adaptive method
    h: f64,
    k: [Vec<f64>; 7],
    tmp: Vec<f64>,
    next: Vec<f64>,
    steps: usize,
    rejected: usize,
}

impl<'a, S: OdeSystem + ?Sized> Stepper<'a, S> {
    fn new(system: &'a S, method: Method, t0: f64, y0: &[f64], span: f64) -> Self {
        let n = y0.len();
        let mut stepper = Self {
            system,
            method,
            h: 0.0,
            k: std::array::from_fn(|_| vec![0.0; n]),
            tmp: vec![0.0; n],
            next: vec![0.0; n],
            steps: 0,
            rejected: 0,
        };
        stepper.h = match method {
            Method::Rk4 { dt } => dt,
            Method::DormandPrince { rtol, atol } => stepper.initial_step(t0, y0, span, rtol, atol),
        };
        stepper
    }

    /// Starting step from the scale of y and f(t0, y0)
    fn initial_step(&mut self, t0: f64, y0: &[f64], span: f64, rtol: f64, atol: f64) -> f64 {
        self.system.rhs(t0, y0, &mut self.k[0]);
        let mut d0 = 0.0;
        let mut d1 = 0.0;
        for (y, f) in y0.iter().zip(&self.k[0]) {
            let scale = atol + rtol * y.abs();
            d0 += (y / scale).powi(2);
            d1 += (f / scale).powi(2);
        }
        let n = y0.len().max(1) as f64;
        let (d0, d1) = ((d0 / n).sqrt(), (d1 / n).sqrt());
        let h = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        if span > 0.0 {
            h.min(span)
        } else {
            h
        }
    }

    fn advance(&mut self, t: &mut f64, y: &mut Vec<f64>, target: f64) -> SimResult<()> {
        let mut count = 0;
        while *t < target {
            count += 1;
            if count > MAX_STEPS_PER_INTERVAL {
                return Err(SimError::Diverged { t: *t });
            }
            let remaining = target - *t;
            let h = self.h.min(remaining);
            let accepted = match self.method {
                Method::Rk4 { .. } => {
                    self.rk4_step(*t, y, h);
                    true
                }
                Method::DormandPrince { rtol, atol } => self.dopri_step(*t, y, h, rtol, atol, h < self.h)?,
            };
            if accepted {
                self.steps += 1;
                std::mem::swap(y, &mut self.next);
                // Land exactly on the sample time rather than a rounding hair short
                *t = if h >= remaining { target } else { *t + h };
                check_finite(y, *t)?;
            } else {
                self.rejected += 1;
            }
        }
        Ok(())
    }

    fn rk4_step(&mut self, t: f64, y: &[f64], h: f64) {
        let n = y.len();
        let [k1, k2, k3, k4, ..] = &mut self.k;
        self.system.rhs(t, y, k1);
        for i in 0..n {
            self.tmp[i] = y[i] + 0.5 * h * k1[i];
        }
        self.system.rhs(t + 0.5 * h, &self.tmp, k2);
        for i in 0..n {
            self.tmp[i] = y[i] + 0.5 * h * k2[i];
        }
        self.system.rhs(t + 0.5 * h, &self.tmp, k3);
        for i in 0..n {
            self.tmp[i] = y[i] + h * k3[i];
        }
        self.system.rhs(t + h, &self.tmp, k4);
        for i in 0..n {
            self.next[i] = y[i] + h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
    }

    /// One Dormand-Prince attempt with step `h`. On acceptance the new state is
    /// in `self.next`. `clipped` marks a step shortened to hit a sample time,
    /// whose success should not shrink the proposal for the next interval.
    fn dopri_step(
        &mut self,
        t: f64,
        y: &[f64],
        h: f64,
        rtol: f64,
        atol: f64,
        clipped: bool,
    ) -> SimResult<bool> {
        let n = y.len();
        let [k1, k2, k3, k4, k5, k6, k7] = &mut self.k;
        let tmp = &mut self.tmp;

        self.system.rhs(t, y, k1);
        for i in 0..n {
            tmp[i] = y[i] + h * (dp::A21 * k1[i]);
        }
        self.system.rhs(t + dp::C2 * h, &tmp[..], k2);
        for i in 0..n {
            tmp[i] = y[i] + h * (dp::A31 * k1[i] + dp::A32 * k2[i]);
        }
        self.system.rhs(t + dp::C3 * h, &tmp[..], k3);
        for i in 0..n {
            tmp[i] = y[i] + h * (dp::A41 * k1[i] + dp::A42 * k2[i] + dp::A43 * k3[i]);
        }
        self.system.rhs(t + dp::C4 * h, &tmp[..], k4);
        for i in 0..n {
            tmp[i] = y[i]
                + h * (dp::A51 * k1[i] + dp::A52 * k2[i] + dp::A53 * k3[i] + dp::A54 * k4[i]);
        }
        self.system.rhs(t + dp::C5 * h, &tmp[..], k5);
        for i in 0..n {
            tmp[i] = y[i]
                + h * (dp::A61 * k1[i]
                    + dp::A62 * k2[i]
                    + dp::A63 * k3[i]
                    + dp::A64 * k4[i]
                    + dp::A65 * k5[i]);
        }
        self.system.rhs(t + h, &tmp[..], k6);
        for i in 0..n {
            self.next[i] = y[i]
                + h * (dp::B1 * k1[i]
                    + dp::B3 * k3[i]
                    + dp::B4 * k4[i]
                    + dp::B5 * k5[i]
                    + dp::B6 * k6[i]);
        }
        self.system.rhs(t + h, &self.next, k7);

        let mut err_sq = 0.0;
        for i in 0..n {
            let e = h
                * (dp::E1 * k1[i]
                    + dp::E3 * k3[i]
                    + dp::E4 * k4[i]
                    + dp::E5 * k5[i]
                    + dp::E6 * k6[i]
                    + dp::E7 * k7[i]);
            let scale = atol + rtol * y[i].abs().max(self.next[i].abs());
            err_sq += (e / scale).powi(2);
        }
        let err = (err_sq / n.max(1) as f64).sqrt();
        if !err.is_finite() {
            return Err(SimError::Diverged { t });
        }

        let factor = if err == 0.0 {
            dp::MAX_FACTOR
        } else {
            (dp::SAFETY * err.powf(-0.2)).clamp(dp::MIN_FACTOR, dp::MAX_FACTOR)
        };

        if err <= 1.0 {
            if !clipped {
                self.h = h * factor;
            }
            Ok(true)
        } else {
            self.h = h * factor.min(1.0);
            if self.h <= f64::EPSILON * t.abs().max(1.0) {
                return Err(SimError::Diverged { t });
            }
            Ok(false)
        }
    }
}

/// Dormand-Prince 5(4) tableau
mod dp {
    pub const C2: f64 = 1.0 / 5.0;
    pub const C3: f64 = 3.0 / 10.0;
    pub const C4: f64 = 4.0 / 5.0;
    pub const C5: f64 = 8.0 / 9.0;

    pub const A21: f64 = 1.0 / 5.0;
    pub const A31: f64 = 3.0 / 40.0;
    pub const A32: f64 = 9.0 / 40.0;
    pub const A41: f64 = 44.0 / 45.0;
    pub const A42: f64 = -56.0 / 15.0;
    pub const A43: f64 = 32.0 / 9.0;
    pub const A51: f64 = 19372.0 / 6561.0;
    pub const A52: f64 = -25360.0 / 2187.0;
    pub const A53: f64 = 64448.0 / 6561.0;
    pub const A54: f64 = -212.0 / 729.0;
    pub const A61: f64 = 9017.0 / 3168.0;
    pub const A62: f64 = -355.0 / 33.0;
    pub const A63: f64 = 46732.0 / 5247.0;
    pub const A64: f64 = 49.0 / 176.0;
    pub const A65: f64 = -5103.0 / 18656.0;

    // Fifth-order weights (B2 = 0, B7 = 0)
    pub const B1: f64 = 35.0 / 384.0;
    pub const B3: f64 = 500.0 / 1113.0;
    pub const B4: f64 = 125.0 / 192.0;
    pub const B5: f64 = -2187.0 / 6784.0;
    pub const B6: f64 = 11.0 / 84.0;

    // Fifth minus fourth order weights (E2 = 0)
    pub const E1: f64 = 71.0 / 57600.0;
    pub const E3: f64 = -71.0 / 16695.0;
    pub const E4: f64 = 71.0 / 1920.0;
    pub const E5: f64 = -17253.0 / 339200.0;
    pub const E6: f64 = 22.0 / 525.0;
    pub const E7: f64 = -1.0 / 40.0;

    pub const SAFETY: f64 = 0.9;
    pub const MIN_FACTOR: f64 = 0.2;
    pub const MAX_FACTOR: f64 = 5.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// dy/dt = -k y
    struct Decay(f64);

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -self.0 * y[0];
        }
    }

    /// dy/dt = y^2 blows up at t = 1 from y(0) = 1
    struct Blowup;

    impl OdeSystem for Blowup {
        fn dimension(&self) -> usize {
            1
        }

        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[0] * y[0];
        }
    }

    const DOPRI: Method = Method::DormandPrince {
        rtol: 1e-10,
        atol: 1e-12,
    };

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_decay_accuracy() {
        let times = linspace(0.0, 2.0, 21);
        for method in [Method::Rk4 { dt: 0.01 }, DOPRI] {
            let traj = integrate(&Decay(1.5), method, &[2.0], &times).unwrap();
            assert_eq!(traj.len(), 21);
            assert_eq!(traj.labels, vec!["y0".to_string()]);
            for point in &traj.points {
                let exact = 2.0 * (-1.5 * point.t).exp();
                assert!((point.state[0] - exact).abs() < 1e-8, "{:?} at t={}", method, point.t);
            }
        }
    }

    #[test]
    fn test_samples_land_on_requested_times() {
        let times = [0.0, 0.013, 0.5, 0.51, 3.0];
        let traj = integrate(&Decay(1.0), Method::Rk4 { dt: 0.1 }, &[1.0], &times).unwrap();
        assert_eq!(traj.times(), times.to_vec());
    }

    #[test]
    fn test_single_time_returns_initial_state() {
        let traj = integrate(&Decay(1.0), DOPRI, &[4.0], &[1.0]).unwrap();
        assert_eq!(traj.len(), 1);
        assert_eq!(traj.points[0].state, vec![4.0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let system = Decay(1.0);
        assert!(integrate(&system, DOPRI, &[1.0], &[]).is_err());
        assert!(integrate(&system, DOPRI, &[1.0], &[0.0, 1.0, 1.0]).is_err());
        assert!(integrate(&system, DOPRI, &[1.0, 2.0], &[0.0, 1.0]).is_err());
        assert!(integrate(&system, Method::Rk4 { dt: 0.0 }, &[1.0], &[0.0, 1.0]).is_err());
        assert!(integrate(&system, DOPRI, &[f64::NAN], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_blowup_is_reported() {
        let result = integrate(&Blowup, DOPRI, &[1.0], &[0.0, 2.0]);
        assert!(matches!(result, Err(SimError::Diverged { .. })));
    }
}
