// ABOUTME: Wait step handler
// ABOUTME: Suspends the run for a whole number of seconds

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use super::params::{decode, lenient_int, non_negative};
use super::StepHandler;
use crate::engine::error::Result;
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

#[derive(Debug, Default, Deserialize)]
struct WaitParams {
    #[serde(default, deserialize_with = "lenient_int")]
    seconds: Option<i64>,
}

pub struct WaitStep;

#[async_trait]
impl StepHandler for WaitStep {
    fn step_type(&self) -> StepType {
        StepType::Wait
    }

    async fn execute(&self, step: &Step, _scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: WaitParams = decode(step)?;
        let seconds = non_negative(params.seconds);
        info!("Executing wait step: {}s", seconds);

        if seconds > 0 {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
        }
        Ok(StepOutcome::Completed)
    }
}
