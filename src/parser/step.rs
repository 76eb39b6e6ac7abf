// ABOUTME: Step data model: the closed set of step types and their payloads
// ABOUTME: Defines StepType, Step, Payload and the StepPath used to address steps in a tree

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::error::ParserError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Click,
    Input,
    Screenshot,
    FileCopy,
    ExcelWrite,
    #[serde(alias = "if")]
    Condition,
    #[serde(alias = "for")]
    Loop,
    Wait,
    Notify,
}

impl StepType {
    pub const ALL: [StepType; 9] = [
        StepType::Click,
        StepType::Input,
        StepType::Screenshot,
        StepType::FileCopy,
        StepType::ExcelWrite,
        StepType::Condition,
        StepType::Loop,
        StepType::Wait,
        StepType::Notify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Click => "click",
            StepType::Input => "input",
            StepType::Screenshot => "screenshot",
            StepType::FileCopy => "file_copy",
            StepType::ExcelWrite => "excel_write",
            StepType::Condition => "condition",
            StepType::Loop => "loop",
            StepType::Wait => "wait",
            StepType::Notify => "notify",
        }
    }

    /// Whether payloads of this type may own nested steps.
    pub fn is_composite(&self) -> bool {
        matches!(self, StepType::Loop)
    }

    /// Every tag accepted by the loader, aliases included.
    pub fn supported_tags() -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = Self::ALL.iter().map(|t| t.as_str()).collect();
        tags.extend(["if", "for"]);
        tags
    }
}

impl FromStr for StepType {
    type Err = ParserError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "click" => Ok(StepType::Click),
            "input" => Ok(StepType::Input),
            "screenshot" => Ok(StepType::Screenshot),
            "file_copy" => Ok(StepType::FileCopy),
            "excel_write" => Ok(StepType::ExcelWrite),
            "condition" | "if" => Ok(StepType::Condition),
            "loop" | "for" => Ok(StepType::Loop),
            "wait" => Ok(StepType::Wait),
            "notify" => Ok(StepType::Notify),
            other => Err(ParserError::InvalidStepType {
                tag: other.to_string(),
                path: StepPath::root(),
                supported: Self::supported_tags(),
            }),
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters attached to a step.
///
/// `params` is the free-form key/value bag from the description. For `loop`
/// steps the nested descriptors have already been turned into [`Step`]s and
/// live in `steps`; the raw `steps` key is no longer present in `params`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    params: Map<String, Value>,
    steps: Vec<Step>,
}

impl Payload {
    pub fn new(params: Map<String, Value>) -> Self {
        Self {
            params,
            steps: Vec::new(),
        }
    }

    pub fn with_steps(params: Map<String, Value>, steps: Vec<Step>) -> Self {
        Self { params, steps }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.steps.is_empty()
    }

    /// The payload as a JSON object, with nested steps written back under `steps`.
    pub fn to_value(&self, step_type: StepType) -> Value {
        let mut object = self.params.clone();
        if step_type.is_composite() {
            let nested = self.steps.iter().map(Step::to_value).collect();
            object.insert("steps".to_string(), Value::Array(nested));
        }
        Value::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    step_type: StepType,
    payload: Payload,
}

impl Step {
    pub fn new(step_type: StepType, payload: Payload) -> Self {
        Self { step_type, payload }
    }

    /// A step with no parameters.
    pub fn bare(step_type: StepType) -> Self {
        Self::new(step_type, Payload::default())
    }

    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn children(&self) -> &[Step] {
        self.payload.steps()
    }

    /// Serialize back into the descriptor shape the loader accepts.
    pub fn to_value(&self) -> Value {
        let mut descriptor = Map::new();
        descriptor.insert(
            "type".to_string(),
            Value::String(self.step_type.as_str().to_string()),
        );
        if !self.payload.is_empty() || self.step_type.is_composite() {
            descriptor.insert("payload".to_string(), self.payload.to_value(self.step_type));
        }
        Value::Object(descriptor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    index: usize,
    iteration: Option<usize>,
}

/// Location of a step inside a workflow tree, e.g. `steps[1].iter[0].steps[2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepPath {
    segments: Vec<Segment>,
}

impl StepPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn at(index: usize) -> Self {
        Self::root().child(index)
    }

    /// Path of the `index`-th nested step, without loop iteration context.
    pub fn child(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            index,
            iteration: None,
        });
        Self { segments }
    }

    /// Path of the `index`-th nested step during loop iteration `iteration`.
    pub fn iteration_child(&self, iteration: usize, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            index,
            iteration: Some(iteration),
        });
        Self { segments }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the addressed step among its siblings.
    pub fn index(&self) -> Option<usize> {
        self.segments.last().map(|s| s.index)
    }
}

impl fmt::Display for StepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                write!(f, ".")?;
            }
            if let Some(iteration) = segment.iteration {
                write!(f, "iter[{}].", iteration)?;
            }
            write!(f, "steps[{}]", segment.index)?;
        }
        Ok(())
    }
}
