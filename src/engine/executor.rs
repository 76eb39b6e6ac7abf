// ABOUTME: Recursive step executor and the sequential workflow runner
// ABOUTME: Dispatches each step to its registered handler and stops a run at the first failure

use futures::future::{BoxFuture, FutureExt};
use std::time::Instant;
use tracing::{error, info, instrument};

use super::context::{ExecutionContext, TraceEntry};
use super::error::{ExecutionError, Result};
use super::result::{StepOutcome, StepRecord, WorkflowResult};
use crate::capabilities::Capabilities;
use crate::parser::{Step, StepPath, Workflow};
use crate::steps::StepRegistry;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_SMTP_SERVER: &str = "localhost";
pub const DEFAULT_FROM_ADDR: &str = "stepflow@localhost";

/// Run-wide settings handlers read from their scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Deepest step path allowed; root steps sit at depth 1.
    pub max_depth: usize,
    /// Used by notify steps that name no `smtp_server`.
    pub smtp_server: String,
    /// Used by notify steps that name no `from_addr`.
    pub from_addr: String,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            from_addr: DEFAULT_FROM_ADDR.to_string(),
        }
    }
}

pub struct StepExecutor {
    registry: StepRegistry,
    capabilities: Capabilities,
    settings: ExecutorSettings,
}

impl StepExecutor {
    /// Executor with every built-in step handler registered.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            registry: StepRegistry::builtin(),
            capabilities,
            settings: ExecutorSettings::default(),
        }
    }

    pub fn with_registry(mut self, registry: StepRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Execute a single step outside of any workflow, as if it were the first root step.
    pub async fn execute(&self, step: &Step) -> Result<StepOutcome> {
        let context = ExecutionContext::new(step.step_type().to_string());
        self.execute_at(step, &StepPath::at(0), None, &context).await
    }

    /// Execute `step` located at `path`, recursing through composite steps.
    ///
    /// Failures come back wrapped once in `StepFailed` naming the innermost
    /// step that raised them.
    pub fn execute_at<'a>(
        &'a self,
        step: &'a Step,
        path: &'a StepPath,
        iteration: Option<usize>,
        context: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<StepOutcome>> {
        async move {
            let step_type = step.step_type();
            let depth = path.depth();
            if depth > self.settings.max_depth {
                return Err(ExecutionError::NestingTooDeep {
                    depth,
                    limit: self.settings.max_depth,
                }
                .at_step(path, step_type));
            }

            context.record(TraceEntry::for_step(step, path, iteration));

            let handler = self
                .registry
                .get(step_type)
                .ok_or(ExecutionError::UnhandledStepType { step_type })
                .map_err(|e| e.at_step(path, step_type))?;

            let scope = StepScope {
                executor: self,
                context,
                path,
            };
            handler
                .execute(step, &scope)
                .await
                .map_err(|e| e.at_step(path, step_type))
        }
        .boxed()
    }
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("handlers", &self.registry.supported_types())
            .field("settings", &self.settings)
            .finish()
    }
}

/// What a handler can reach while executing one step.
pub struct StepScope<'a> {
    executor: &'a StepExecutor,
    context: &'a ExecutionContext,
    path: &'a StepPath,
}

impl<'a> StepScope<'a> {
    pub fn capabilities(&self) -> &'a Capabilities {
        &self.executor.capabilities
    }

    pub fn settings(&self) -> &'a ExecutorSettings {
        &self.executor.settings
    }

    pub fn context(&self) -> &'a ExecutionContext {
        self.context
    }

    pub fn path(&self) -> &'a StepPath {
        self.path
    }

    /// Execute a nested step of this one through the same dispatch entry point.
    pub async fn execute_child(
        &self,
        step: &Step,
        iteration: usize,
        index: usize,
    ) -> Result<StepOutcome> {
        let path = self.path.iteration_child(iteration, index);
        self.executor
            .execute_at(step, &path, Some(iteration), self.context)
            .await
    }
}

/// Runs the root steps of a workflow in order, stopping at the first failure.
#[derive(Debug)]
pub struct WorkflowRunner {
    executor: StepExecutor,
}

impl WorkflowRunner {
    pub fn new(executor: StepExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &StepExecutor {
        &self.executor
    }

    #[instrument(skip(self, workflow), fields(workflow_name = %workflow.display_name()))]
    pub async fn run(&self, workflow: &Workflow) -> Result<WorkflowResult> {
        let context = ExecutionContext::new(workflow.display_name().to_string());
        self.run_with_context(workflow, &context).await
    }

    /// Run with a caller-owned context, so the trace stays readable when the run fails.
    #[instrument(skip(self, workflow, context), fields(workflow_name = %workflow.display_name(), run_id = %context.run_id))]
    pub async fn run_with_context(
        &self,
        workflow: &Workflow,
        context: &ExecutionContext,
    ) -> Result<WorkflowResult> {
        let started = Instant::now();
        info!(
            "Starting workflow execution: {} (run_id: {}, {} root steps)",
            workflow.display_name(),
            context.run_id,
            workflow.len()
        );

        let mut result =
            WorkflowResult::new(workflow.display_name().to_string(), context.run_id.clone());

        for (index, step) in workflow.steps.iter().enumerate() {
            let path = StepPath::at(index);
            let mut record = StepRecord::new(index, step.step_type());

            match self.executor.execute_at(step, &path, None, context).await {
                Ok(outcome) => {
                    record.mark_succeeded(outcome);
                    result.add_step_record(record);
                }
                Err(e) => {
                    error!(
                        "Workflow {} stopped after {} of {} root steps: {}",
                        workflow.display_name(),
                        index,
                        workflow.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        result.mark_completed(context.trace());
        info!(
            "Workflow execution completed in {:?}: {} root steps, {} steps entered",
            started.elapsed(),
            result.steps.len(),
            result.trace.len()
        );
        Ok(result)
    }
}
