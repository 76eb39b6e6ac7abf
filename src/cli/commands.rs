// ABOUTME: The run command behind the stepflow CLI
// ABOUTME: Loads a workflow, executes it with native capabilities and reports the result

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::config::Config;
use crate::capabilities::{Capabilities, ElementCaptureServer};
use crate::engine::{ExecutionContext, StepExecutor, WorkflowResult, WorkflowRunner};
use crate::parser::{Workflow, WorkflowLoader};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub workflow: PathBuf,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
    pub capture: bool,
}

/// What `--output` writes: the run result plus anything captured alongside it.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    #[serde(flatten)]
    result: &'a WorkflowResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    captured_elements: Vec<Value>,
}

/// Execute a workflow command
pub async fn run_workflow(options: RunOptions, config: &Config) -> Result<()> {
    info!("Loading workflow: {}", options.workflow.display());

    let workflow = WorkflowLoader::new()
        .load_file(&options.workflow)
        .await
        .with_context(|| format!("Failed to load workflow {}", options.workflow.display()))?;
    info!(
        "Loaded workflow '{}': {} root steps, {} total, nesting depth {}",
        workflow.display_name(),
        workflow.len(),
        workflow.total_steps(),
        workflow.max_depth()
    );

    if options.dry_run {
        print_validation(&workflow, config);
        return Ok(());
    }

    let executor = StepExecutor::new(Capabilities::native(config.smtp.port))
        .with_settings(config.executor_settings());
    let missing = executor.registry().missing_types();
    if !missing.is_empty() {
        warn!("No handlers registered for step types: {:?}", missing);
    }
    let runner = WorkflowRunner::new(executor);

    let mut capture = if options.capture {
        let mut server = ElementCaptureServer::new(config.capture.host.clone(), config.capture.port);
        server
            .start()
            .await
            .context("Failed to start element capture listener")?;
        Some(server)
    } else {
        None
    };

    let context = ExecutionContext::new(workflow.display_name().to_string());
    let outcome = runner.run_with_context(&workflow, &context).await;

    let captured_elements = match capture.as_mut() {
        Some(server) => {
            if let Err(e) = server.stop().await {
                warn!("Failed to stop element capture listener: {}", e);
            }
            server.snapshot()
        }
        None => Vec::new(),
    };

    let result = outcome.with_context(|| {
        format!(
            "Workflow '{}' failed after entering {} steps",
            workflow.display_name(),
            context.trace_len()
        )
    })?;

    if let Some(output_path) = &options.output {
        write_report(output_path, &result, captured_elements.clone()).await?;
    }

    print_summary(&result, captured_elements.len());
    info!("Workflow execution completed");
    Ok(())
}

async fn write_report(path: &Path, result: &WorkflowResult, captured: Vec<Value>) -> Result<()> {
    let report = RunReport {
        result,
        captured_elements: captured,
    };
    let json_content =
        serde_json::to_string_pretty(&report).context("Failed to serialize results to JSON")?;

    tokio::fs::write(path, json_content)
        .await
        .with_context(|| format!("Failed to write output file '{}'", path.display()))?;

    info!("Results written to: {}", path.display());
    Ok(())
}

fn print_validation(workflow: &Workflow, config: &Config) {
    println!("✓ Workflow '{}' is valid", workflow.display_name());
    println!("  Root steps: {}", workflow.len());
    println!("  Total steps: {}", workflow.total_steps());
    println!("  Nesting depth: {}", workflow.max_depth());

    if workflow.max_depth() > config.engine.max_depth {
        println!(
            "  Warning: nesting exceeds the configured limit of {}",
            config.engine.max_depth
        );
    }
}

fn print_summary(result: &WorkflowResult, captured: usize) {
    println!(
        "Workflow '{}' completed: {} root steps succeeded",
        result.workflow_name,
        result.steps.len()
    );

    for record in &result.steps {
        let outcome = record
            .outcome
            .map(|o| o.to_string())
            .unwrap_or_else(|| record.status.to_string());
        println!("  [{}] {}: {}", record.index, record.step_type, outcome);
    }

    if captured > 0 {
        println!("  Captured elements: {}", captured);
    }
}
