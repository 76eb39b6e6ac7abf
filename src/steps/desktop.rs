// ABOUTME: Pointer and keyboard step handlers
// ABOUTME: click moves and presses the primary button; input types text at the focus

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::params::{decode, lenient_int, lenient_string};
use super::StepHandler;
use crate::capabilities::ElementQuery;
use crate::engine::error::{ExecutionError, Result};
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

#[derive(Debug, Default, Deserialize)]
struct ClickParams {
    #[serde(default, deserialize_with = "lenient_int")]
    x: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    y: Option<i64>,
    /// Attributes of a native UI element to click at the center of.
    #[serde(default)]
    element: Option<ElementQuery>,
}

pub struct ClickStep;

#[async_trait]
impl StepHandler for ClickStep {
    fn step_type(&self) -> StepType {
        StepType::Click
    }

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: ClickParams = decode(step)?;
        info!("Executing click step");

        let capabilities = scope.capabilities();
        let position = match (params.element, params.x, params.y) {
            (Some(query), _, _) => {
                let bounds = capabilities.elements.locate(&query).await?;
                debug!("Located element {:?} at {:?}", query, bounds);
                Some(bounds.center())
            }
            (None, None, None) => None,
            (None, Some(x), Some(y)) => Some((coordinate("x", x)?, coordinate("y", y)?)),
            (None, x, y) => {
                // One axis given: keep the pointer where it is on the other.
                let (current_x, current_y) = capabilities.desktop.cursor_position().await?;
                Some((
                    x.map(|v| coordinate("x", v)).transpose()?.unwrap_or(current_x),
                    y.map(|v| coordinate("y", v)).transpose()?.unwrap_or(current_y),
                ))
            }
        };

        capabilities.desktop.click(position).await?;
        Ok(StepOutcome::Completed)
    }
}

fn coordinate(name: &str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| ExecutionError::InvalidParameter {
        step_type: StepType::Click,
        parameter: name.to_string(),
        reason: format!("{} is out of range for a screen coordinate", value),
    })
}

#[derive(Debug, Default, Deserialize)]
struct InputParams {
    #[serde(default, deserialize_with = "lenient_string")]
    text: Option<String>,
}

pub struct InputStep;

#[async_trait]
impl StepHandler for InputStep {
    fn step_type(&self) -> StepType {
        StepType::Input
    }

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: InputParams = decode(step)?;
        let text = params.text.unwrap_or_default();
        info!("Executing input step ({} characters)", text.chars().count());

        scope.capabilities().desktop.type_text(&text).await?;
        Ok(StepOutcome::Completed)
    }
}
