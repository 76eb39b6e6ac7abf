// ABOUTME: Loop step handler
// ABOUTME: Runs the nested steps `count` times in order, stopping at the first failure

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::params::{decode, lenient_int, non_negative};
use super::StepHandler;
use crate::engine::error::Result;
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

#[derive(Debug, Default, Deserialize)]
struct LoopParams {
    #[serde(default, deserialize_with = "lenient_int")]
    count: Option<i64>,
}

pub struct LoopStep;

#[async_trait]
impl StepHandler for LoopStep {
    fn step_type(&self) -> StepType {
        StepType::Loop
    }

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: LoopParams = decode(step)?;
        let count = non_negative(params.count);
        let body = step.children();
        info!(
            "Executing loop step: {} iterations over {} steps",
            count,
            body.len()
        );

        for iteration in 0..count as usize {
            debug!("Loop iteration {}/{}", iteration + 1, count);
            for (index, child) in body.iter().enumerate() {
                scope.execute_child(child, iteration, index).await?;
            }
        }

        Ok(StepOutcome::Completed)
    }
}
