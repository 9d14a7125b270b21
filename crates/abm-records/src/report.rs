//! Run Reports
//!
//! The document written at the end of every run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{GridSnapshot, Series, Trajectory};

/// Identifies one run of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub model: String,
    pub seed: u64,
    pub steps: u64,
}

impl RunMetadata {
    pub fn new(model: impl Into<String>, seed: u64, steps: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            model: model.into(),
            seed,
            steps,
        }
    }
}

/// Output of a run: collected series for grid models, a trajectory for ODE models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    #[serde(default)]
    pub series: Series,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<Trajectory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_snapshot: Option<GridSnapshot>,
}

impl RunReport {
    pub fn new(metadata: RunMetadata) -> Self {
        Self {
            metadata,
            series: Series::new(),
            trajectory: None,
            final_snapshot: None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepRecord;

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunMetadata::new("growth", 42, 10);
        let b = RunMetadata::new("growth", 42, 10);
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_report_json_parses_back() {
        let mut report = RunReport::new(RunMetadata::new("wealth", 7, 3));
        report.series.model_vars.push(StepRecord::new(0).with_value("gini", 0.0));

        let json = report.to_json().unwrap();
        assert!(!json.contains("trajectory"));
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
