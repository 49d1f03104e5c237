//! Scheduler run records exposed through the status API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a scheduler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// One scheduled task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    /// Task name, e.g. "cleanup".
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// None while the run is still in flight.
    pub outcome: Option<JobOutcome>,
}

impl JobRun {
    pub fn begin(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
        }
    }

    pub fn finish(&mut self, outcome: JobOutcome) {
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }
}

/// Response shape for the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerHistory {
    pub running: bool,
    /// Most recent run first.
    pub history: Vec<JobRun>,
}
