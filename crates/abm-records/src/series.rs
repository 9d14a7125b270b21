//! Series Types
//!
//! Per-step rows produced by the data collector: one row of model-level
//! values per step, and one row of agent-level values per agent per step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model-level values recorded at the end of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub values: BTreeMap<String, f64>,
}

impl StepRecord {
    pub fn new(step: u64) -> Self {
        Self {
            step,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Agent-level values recorded at the end of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub step: u64,
    pub agent_id: u64,
    pub values: BTreeMap<String, f64>,
}

/// Everything the collector recorded over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub model_vars: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_vars: Vec<AgentRecord>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of model rows recorded
    pub fn len(&self) -> usize {
        self.model_vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.model_vars.is_empty()
    }

    /// Names of every model column that appears in any row
    pub fn columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .model_vars
            .iter()
            .flat_map(|row| row.values.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// All values of one model column, in step order. Missing cells are skipped.
    pub fn column(&self, name: &str) -> Vec<f64> {
        self.model_vars.iter().filter_map(|row| row.get(name)).collect()
    }

    /// (step, value) pairs for one model column
    pub fn column_with_steps(&self, name: &str) -> Vec<(u64, f64)> {
        self.model_vars
            .iter()
            .filter_map(|row| row.get(name).map(|v| (row.step, v)))
            .collect()
    }

    /// Most recent value of a model column
    pub fn last(&self, name: &str) -> Option<f64> {
        self.model_vars.iter().rev().find_map(|row| row.get(name))
    }

    /// Agent rows recorded at a given step
    pub fn agents_at(&self, step: u64) -> Vec<&AgentRecord> {
        self.agent_vars.iter().filter(|r| r.step == step).collect()
    }

    /// Render the model columns as a plain text table, one line per step
    pub fn to_table(&self) -> String {
        let columns = self.columns();
        let mut out = format!("{:>6}", "step");
        for name in &columns {
            out.push_str(&format!(" {:>14}", name));
        }
        out.push('\n');
        for row in &self.model_vars {
            out.push_str(&format!("{:>6}", row.step));
            for name in &columns {
                match row.get(name) {
                    Some(v) => out.push_str(&format!(" {:>14.4}", v)),
                    None => out.push_str(&format!(" {:>14}", "-")),
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Series {
        Series {
            model_vars: vec![
                StepRecord::new(0).with_value("population", 5.0),
                StepRecord::new(1).with_value("population", 12.0).with_value("gini", 0.1),
                StepRecord::new(2).with_value("population", 30.0),
            ],
            agent_vars: Vec::new(),
        }
    }

    #[test]
    fn test_column_access() {
        let series = sample();
        assert_eq!(series.len(), 3);
        assert_eq!(series.column("population"), vec![5.0, 12.0, 30.0]);
        assert_eq!(series.column("gini"), vec![0.1]);
        assert_eq!(series.last("population"), Some(30.0));
        assert_eq!(series.last("gini"), Some(0.1));
        assert_eq!(series.last("missing"), None);
        assert_eq!(series.columns(), vec!["gini".to_string(), "population".to_string()]);
    }

    #[test]
    fn test_table_has_one_line_per_step() {
        let table = sample().to_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("population"));
        assert!(lines[1].contains('-'));
    }

    #[test]
    fn test_empty_agent_vars_are_omitted() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("agent_vars"));

        let parsed: Series = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }
}
