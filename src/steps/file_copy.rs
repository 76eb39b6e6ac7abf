// ABOUTME: File copy step handler
// ABOUTME: Copies src to dst byte for byte through the file store

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::params::{decode, lenient_string, required};
use super::StepHandler;
use crate::engine::error::Result;
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

#[derive(Debug, Default, Deserialize)]
struct FileCopyParams {
    #[serde(default, deserialize_with = "lenient_string")]
    src: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    dst: Option<String>,
}

pub struct FileCopyStep;

#[async_trait]
impl StepHandler for FileCopyStep {
    fn step_type(&self) -> StepType {
        StepType::FileCopy
    }

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: FileCopyParams = decode(step)?;
        // Both paths are checked before the store is touched.
        let src = required(StepType::FileCopy, "src", params.src)?;
        let dst = required(StepType::FileCopy, "dst", params.dst)?;
        info!("Executing file_copy step: {} -> {}", src, dst);

        let files = &scope.capabilities().files;
        let bytes = files.read_bytes(Path::new(&src)).await?;
        files.write_bytes(Path::new(&dst), &bytes).await?;

        info!("Copied {} bytes from {} to {}", bytes.len(), src, dst);
        Ok(StepOutcome::Completed)
    }
}
