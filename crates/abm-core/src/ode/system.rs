//! ODE Systems

/// A first-order system dy/dt = f(t, y)
pub trait OdeSystem {
    /// Number of state components
    fn dimension(&self) -> usize;

    /// Write f(t, y) into `dydt`. Both slices have length `dimension()`.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);

    /// Names of the state components, used to label trajectories
    fn labels(&self) -> Vec<String> {
        (0..self.dimension()).map(|i| format!("y{}", i)).collect()
    }
}
