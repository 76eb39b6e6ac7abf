// ABOUTME: Execution context and the step trace sink
// ABOUTME: Records one trace entry per step entered so a run can be reconstructed afterwards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::parser::{Step, StepPath, StepType};

/// Payload keys worth recording in the trace, in display order.
const TRACE_FIELDS: [&str; 16] = [
    "x",
    "y",
    "text",
    "path",
    "src",
    "dst",
    "sheet",
    "cell",
    "value",
    "operator",
    "conditions",
    "condition",
    "count",
    "seconds",
    "message",
    "email",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub path: String,
    pub depth: usize,
    pub step_type: StepType,
    pub iteration: Option<usize>,
    pub details: BTreeMap<String, String>,
    pub entered_at: DateTime<Utc>,
}

impl TraceEntry {
    pub fn for_step(step: &Step, path: &StepPath, iteration: Option<usize>) -> Self {
        let payload = step.payload();
        let mut details: BTreeMap<String, String> = TRACE_FIELDS
            .iter()
            .filter_map(|key| payload.get(key).map(|v| (key.to_string(), render(v))))
            .collect();
        if step.step_type().is_composite() {
            details.insert("steps".to_string(), step.children().len().to_string());
        }

        Self {
            path: path.to_string(),
            depth: path.depth(),
            step_type: step.step_type(),
            iteration,
            details,
            entered_at: Utc::now(),
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Runtime context shared by every step of a single run.
///
/// The trace sink is only written from the task driving the run; the lock
/// exists so the context can be cloned into handlers and read afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub workflow_name: String,
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    trace: Arc<Mutex<Vec<TraceEntry>>>,
}

impl ExecutionContext {
    pub fn new(workflow_name: String) -> Self {
        Self {
            workflow_name,
            run_id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            trace: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a trace entry and mirror it as a structured log event.
    pub fn record(&self, entry: TraceEntry) {
        info!(
            run_id = %self.run_id,
            path = %entry.path,
            step_type = %entry.step_type,
            iteration = ?entry.iteration,
            details = ?entry.details,
            "Entering step"
        );
        self.entries().push(entry);
    }

    /// Snapshot of every step entered so far, in order.
    pub fn trace(&self) -> Vec<TraceEntry> {
        self.entries().clone()
    }

    pub fn trace_len(&self) -> usize {
        self.entries().len()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<TraceEntry>> {
        // A poisoned sink still holds a valid trace.
        self.trace.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
