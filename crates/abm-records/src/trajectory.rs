//! Trajectory Types
//!
//! Sampled solutions of an ODE system: the state vector at each requested time.

use serde::{Deserialize, Serialize};

/// State of the system at one time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub t: f64,
    pub state: Vec<f64>,
}

/// A labelled sequence of sampled states
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// One label per state component, e.g. ["prey", "predators"]
    pub labels: Vec<String>,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, t: f64, state: Vec<f64>) {
        self.points.push(TrajectoryPoint { t, state });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    /// Index of a labelled component
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Values of one component over time
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.points
            .iter()
            .filter_map(|p| p.state.get(index).copied())
            .collect()
    }

    /// (x, y) pairs of two components, for phase plots
    pub fn phase_pairs(&self, x: usize, y: usize) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| Some((*p.state.get(x)?, *p.state.get(y)?)))
            .collect()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    /// Render as a plain text table, one line per sample
    pub fn to_table(&self) -> String {
        let mut out = format!("{:>10}", "t");
        for label in &self.labels {
            out.push_str(&format!(" {:>14}", label));
        }
        out.push('\n');
        for point in &self.points {
            out.push_str(&format!("{:>10.3}", point.t));
            for value in &point.state {
                out.push_str(&format!(" {:>14.4}", value));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_and_phase_pairs() {
        let mut traj = Trajectory::new(vec!["prey".into(), "predators".into()]);
        traj.push(0.0, vec![10.0, 5.0]);
        traj.push(1.0, vec![12.0, 4.0]);

        assert_eq!(traj.len(), 2);
        assert_eq!(traj.index_of("predators"), Some(1));
        assert_eq!(traj.component(0), vec![10.0, 12.0]);
        assert_eq!(traj.phase_pairs(0, 1), vec![(10.0, 5.0), (12.0, 4.0)]);
        assert_eq!(traj.times(), vec![0.0, 1.0]);
        assert!(traj.phase_pairs(0, 7).is_empty());
    }
}
