// ABOUTME: Step execution engine for stepflow workflows
// ABOUTME: Recursive dispatch, run context and trace, outcomes and the workflow runner

pub mod context;
pub mod error;
pub mod executor;
pub mod result;

pub use context::{ExecutionContext, TraceEntry};
pub use error::{ExecutionError, Result};
pub use executor::{ExecutorSettings, StepExecutor, StepScope, WorkflowRunner};
pub use result::{StepOutcome, StepRecord, StepStatus, WorkflowResult};
