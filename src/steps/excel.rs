// ABOUTME: Spreadsheet cell write step handler
// ABOUTME: Opens or creates the workbook, sets one cell and saves it back

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use super::params::{decode, lenient_string, required};
use super::StepHandler;
use crate::capabilities::{parse_cell_reference, CellValue};
use crate::engine::error::{ExecutionError, Result};
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

#[derive(Debug, Default, Deserialize)]
struct ExcelWriteParams {
    #[serde(default, deserialize_with = "lenient_string")]
    path: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    sheet: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    cell: Option<String>,
    #[serde(default)]
    value: Value,
}

pub struct ExcelWriteStep;

#[async_trait]
impl StepHandler for ExcelWriteStep {
    fn step_type(&self) -> StepType {
        StepType::ExcelWrite
    }

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: ExcelWriteParams = decode(step)?;
        let path = required(StepType::ExcelWrite, "path", params.path)?;
        let cell = required(StepType::ExcelWrite, "cell", params.cell)?;
        if parse_cell_reference(&cell).is_none() {
            return Err(ExecutionError::InvalidParameter {
                step_type: StepType::ExcelWrite,
                parameter: "cell".to_string(),
                reason: format!("'{}' is not an A1 cell reference", cell),
            });
        }
        let sheet = params.sheet.filter(|s| !s.trim().is_empty());
        let value = CellValue::from(&params.value);
        info!(
            "Executing excel_write step: {}!{} in {}",
            sheet.as_deref().unwrap_or("<active>"),
            cell,
            path
        );

        let mut workbook = scope
            .capabilities()
            .spreadsheets
            .open_or_create(Path::new(&path))
            .await?;
        workbook.set_cell(sheet.as_deref(), &cell, &value)?;
        workbook.save()?;

        Ok(StepOutcome::Completed)
    }
}
