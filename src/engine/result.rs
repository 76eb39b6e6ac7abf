// ABOUTME: Step outcomes and workflow result aggregation
// ABOUTME: Defines what a step returns and the report produced by a completed run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::context::TraceEntry;
use crate::parser::StepType;

/// What a successfully executed step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Evaluated(bool),
}

impl StepOutcome {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StepOutcome::Evaluated(value) => Some(*value),
            StepOutcome::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StepStatus {
    Running,
    Success,
}

/// Execution record for one root step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub step_type: StepType,
    pub status: StepStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub outcome: Option<StepOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_name: String,
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub steps: Vec<StepRecord>,
    pub trace: Vec<TraceEntry>,
}

impl StepRecord {
    pub fn new(index: usize, step_type: StepType) -> Self {
        Self {
            index,
            step_type,
            status: StepStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            outcome: None,
        }
    }

    pub fn mark_succeeded(&mut self, outcome: StepOutcome) {
        let now = Utc::now();
        self.status = StepStatus::Success;
        self.end_time = Some(now);
        self.duration = Some((now - self.start_time).to_std().unwrap_or(Duration::ZERO));
        self.outcome = Some(outcome);
    }
}

impl WorkflowResult {
    pub fn new(workflow_name: String, run_id: String) -> Self {
        Self {
            workflow_name,
            run_id,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            steps: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn add_step_record(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn mark_completed(&mut self, trace: Vec<TraceEntry>) {
        let now = Utc::now();
        self.end_time = Some(now);
        self.duration = Some((now - self.start_time).to_std().unwrap_or(Duration::ZERO));
        self.trace = trace;
    }

    /// Outcome of the root step at `index`.
    pub fn outcome(&self, index: usize) -> Option<StepOutcome> {
        self.steps.get(index).and_then(|s| s.outcome)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Running => write!(f, "running"),
            StepStatus::Success => write!(f, "success"),
        }
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Completed => write!(f, "completed"),
            StepOutcome::Evaluated(value) => write!(f, "evaluated {}", value),
        }
    }
}
