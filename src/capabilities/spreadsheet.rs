// ABOUTME: Spreadsheet provider for excel_write steps
// ABOUTME: Opens or creates .xlsx workbooks through umya-spreadsheet under the `excel` feature

use std::sync::Arc;

use super::SpreadsheetStore;
#[cfg(not(feature = "excel"))]
use super::Unavailable;

#[cfg(feature = "excel")]
pub use xlsx::XlsxStore;

pub fn native_store() -> Arc<dyn SpreadsheetStore> {
    #[cfg(feature = "excel")]
    {
        Arc::new(XlsxStore)
    }
    #[cfg(not(feature = "excel"))]
    {
        Arc::new(Unavailable::new(
            "built without the `excel` feature; rebuild with --features excel",
        ))
    }
}

const MAX_COLUMN: u32 = 16_384;
const MAX_ROW: u32 = 1_048_576;

/// Parse an A1-style reference such as `B12` or `$C$4` into 1-based `(column, row)`.
///
/// Returns `None` for anything outside the `A1:XFD1048576` grid.
pub fn parse_cell_reference(cell: &str) -> Option<(u32, u32)> {
    let cell = cell.trim();
    let split = cell
        .char_indices()
        .find(|(i, c)| c.is_ascii_digit() || (*c == '$' && *i > 0))
        .map(|(i, _)| i)?;
    let (letters, digits) = cell.split_at(split);
    let letters = letters.strip_prefix('$').unwrap_or(letters);
    let digits = digits.strip_prefix('$').unwrap_or(digits);

    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let column = letters
        .chars()
        .fold(0u32, |acc, c| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1));
    let row: u32 = digits.parse().ok()?;

    ((1..=MAX_COLUMN).contains(&column) && (1..=MAX_ROW).contains(&row)).then_some((column, row))
}

#[cfg(feature = "excel")]
mod xlsx {
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use tracing::debug;
    use umya_spreadsheet::Spreadsheet;

    use super::parse_cell_reference;
    use crate::capabilities::{CellValue, SpreadsheetStore, Workbook};
    use crate::engine::error::{ExecutionError, Result};
    use crate::parser::StepType;

    #[derive(Debug, Default, Clone, Copy)]
    pub struct XlsxStore;

    struct XlsxWorkbook {
        path: PathBuf,
        book: Spreadsheet,
    }

    #[async_trait]
    impl SpreadsheetStore for XlsxStore {
        async fn open_or_create(&self, path: &Path) -> Result<Box<dyn Workbook>> {
            let book = if path.exists() {
                debug!("Opening workbook {}", path.display());
                umya_spreadsheet::reader::xlsx::read(path)
                    .map_err(|e| ExecutionError::capability_failed("spreadsheet store", e))?
            } else {
                debug!("Creating workbook {}", path.display());
                umya_spreadsheet::new_file()
            };
            Ok(Box::new(XlsxWorkbook {
                path: path.to_path_buf(),
                book,
            }))
        }
    }

    impl Workbook for XlsxWorkbook {
        fn set_cell(&mut self, sheet: Option<&str>, cell: &str, value: &CellValue) -> Result<()> {
            let coordinates =
                parse_cell_reference(cell).ok_or_else(|| ExecutionError::InvalidParameter {
                    step_type: StepType::ExcelWrite,
                    parameter: "cell".to_string(),
                    reason: format!("'{}' is not an A1 cell reference", cell),
                })?;

            let worksheet = match sheet {
                Some(name) => self.book.get_sheet_by_name_mut(name).ok_or_else(|| {
                    ExecutionError::capability_failed(
                        "spreadsheet store",
                        format!("sheet '{}' not found", name),
                    )
                })?,
                None => self.book.get_active_sheet_mut(),
            };

            let target = worksheet.get_cell_mut(coordinates);
            match value {
                CellValue::Empty => target.set_value(String::new()),
                CellValue::Bool(b) => target.set_value_bool(*b),
                CellValue::Number(n) => target.set_value_number(*n),
                CellValue::Text(s) => target.set_value(s.clone()),
            };
            Ok(())
        }

        fn save(&mut self) -> Result<()> {
            umya_spreadsheet::writer::xlsx::write(&self.book, &self.path)
                .map_err(|e| ExecutionError::capability_failed("spreadsheet store", e))
        }
    }
}
