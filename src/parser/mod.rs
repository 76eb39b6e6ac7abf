// ABOUTME: Parser module for JSON workflow descriptions
// ABOUTME: Exports the step data model, the loader, and loader errors

pub mod error;
pub mod step;
pub mod workflow;

pub use error::ParserError;
pub use step::{Payload, Step, StepPath, StepType};
pub use workflow::{Workflow, WorkflowLoader};
