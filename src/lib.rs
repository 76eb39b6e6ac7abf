// ABOUTME: Main library module for the stepflow automation workflow interpreter
// ABOUTME: Exports all core modules and provides the public API

pub mod capabilities;
pub mod cli;
pub mod engine;
pub mod parser;
pub mod steps;

// Re-export commonly used types
pub use capabilities::Capabilities;
pub use cli::{App, Args, Config};
pub use engine::{ExecutionError, StepExecutor, StepOutcome, WorkflowResult, WorkflowRunner};
pub use parser::{ParserError, Step, StepType, Workflow, WorkflowLoader};
pub use steps::{StepHandler, StepRegistry};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
