// ABOUTME: Screenshot step handler
// ABOUTME: Captures the screen and writes the image to the payload path

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use super::params::{decode, lenient_string};
use super::StepHandler;
use crate::engine::error::{ExecutionError, Result};
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

pub const DEFAULT_SCREENSHOT_PATH: &str = "screenshot.png";

#[derive(Debug, Default, Deserialize)]
struct ScreenshotParams {
    #[serde(default, deserialize_with = "lenient_string")]
    path: Option<String>,
}

pub struct ScreenshotStep;

#[async_trait]
impl StepHandler for ScreenshotStep {
    fn step_type(&self) -> StepType {
        StepType::Screenshot
    }

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: ScreenshotParams = decode(step)?;
        let path = PathBuf::from(
            params
                .path
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCREENSHOT_PATH.to_string()),
        );
        info!("Executing screenshot step -> {}", path.display());

        let image = scope.capabilities().screen.capture().await?;
        let (width, height) = image.dimensions();

        let target = path.clone();
        tokio::task::spawn_blocking(move || image.save(&target))
            .await
            .map_err(|e| ExecutionError::capability_failed("screen capture", e))?
            .map_err(|e| {
                ExecutionError::capability_failed(
                    "screen capture",
                    format!("cannot save {}: {}", path.display(), e),
                )
            })?;

        info!("Saved {}x{} screenshot to {}", width, height, path.display());
        Ok(StepOutcome::Completed)
    }
}
