// ABOUTME: Workflow data structure and the loader that builds step trees
// ABOUTME: Resolves step tags and materializes nested loop bodies in a single pass

use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, error};

use super::error::{ParserError, Result};
use super::step::{Payload, Step, StepPath, StepType};

/// Field names accepted for the step tag, in lookup order.
const TYPE_FIELDS: [&str; 3] = ["type", "action", "step_type"];
/// Field names accepted for the step parameters, in lookup order.
const PAYLOAD_FIELDS: [&str; 2] = ["payload", "params"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { name: None, steps }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name used in logs and results.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("workflow")
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total number of steps in the tree, nested loop bodies included.
    pub fn total_steps(&self) -> usize {
        fn count(steps: &[Step]) -> usize {
            steps.iter().map(|s| 1 + count(s.children())).sum()
        }
        count(&self.steps)
    }

    /// Deepest nesting level; a flat workflow has depth 1.
    pub fn max_depth(&self) -> usize {
        fn depth(steps: &[Step]) -> usize {
            steps
                .iter()
                .map(|s| 1 + depth(s.children()))
                .max()
                .unwrap_or(0)
        }
        depth(&self.steps)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.steps.iter().map(Step::to_value).collect())
    }

    /// Convert the workflow back into its JSON description.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value()).map_err(ParserError::JsonError)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Workflow> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(ParserError::IoError)?;
        let workflow = self.load_str(&content)?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        Ok(match name {
            Some(name) => workflow.with_name(name),
            None => workflow,
        })
    }

    pub fn load_str(&self, content: &str) -> Result<Workflow> {
        let value: Value = serde_json::from_str(content)?;
        self.load_value(value)
    }

    pub fn load_value(&self, value: Value) -> Result<Workflow> {
        let descriptors = match value {
            Value::Array(items) => items,
            other => {
                return Err(ParserError::InvalidFormat {
                    path: StepPath::root().to_string(),
                    reason: format!("expected a list of steps, found {}", kind_of(&other)),
                })
            }
        };

        let steps = parse_steps(descriptors, &StepPath::root())?;
        let workflow = Workflow::new(steps);
        debug!(
            "Loaded workflow with {} root steps ({} total)",
            workflow.len(),
            workflow.total_steps()
        );
        Ok(workflow)
    }
}

fn parse_steps(descriptors: Vec<Value>, parent: &StepPath) -> Result<Vec<Step>> {
    descriptors
        .into_iter()
        .enumerate()
        .map(|(index, descriptor)| parse_step(descriptor, &parent.child(index)))
        .collect()
}

fn parse_step(descriptor: Value, path: &StepPath) -> Result<Step> {
    let mut descriptor = match descriptor {
        Value::Object(map) => map,
        other => {
            return Err(ParserError::InvalidFormat {
                path: path.to_string(),
                reason: format!("expected a step object, found {}", kind_of(&other)),
            })
        }
    };

    let tag = take_first(&mut descriptor, &TYPE_FIELDS).ok_or_else(|| {
        ParserError::MissingField {
            field: "type".to_string(),
            path: path.to_string(),
        }
    })?;
    let tag = match tag {
        Value::String(tag) => tag,
        other => {
            return Err(ParserError::InvalidFormat {
                path: path.to_string(),
                reason: format!("step type must be a string, found {}", kind_of(&other)),
            })
        }
    };

    let step_type: StepType = tag.parse().map_err(|e: ParserError| {
        error!("Unknown step type '{}' at {}", tag, path);
        e.at(path)
    })?;

    let mut params = match take_first(&mut descriptor, &PAYLOAD_FIELDS) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ParserError::InvalidFormat {
                path: path.to_string(),
                reason: format!("payload must be an object, found {}", kind_of(&other)),
            })
        }
    };

    if step_type.is_composite() {
        let nested = match params.remove("steps") {
            None => Vec::new(),
            Some(Value::Array(items)) => parse_steps(items, path)?,
            Some(other) => {
                return Err(ParserError::InvalidFormat {
                    path: path.to_string(),
                    reason: format!("loop steps must be a list, found {}", kind_of(&other)),
                })
            }
        };
        return Ok(Step::new(step_type, Payload::with_steps(params, nested)));
    }

    Ok(Step::new(step_type, Payload::new(params)))
}

fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| map.remove(*key))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
