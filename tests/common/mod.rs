// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Recording capability doubles, a workflow description builder and temp-dir fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::fs;

use stepflow::capabilities::{
    Capabilities, CellValue, DesktopControl, ElementBounds, ElementLocator, ElementQuery,
    FileStore, LocalFileStore, MailMessage, MailTransport, ScreenCapture, SpreadsheetStore,
    Workbook,
};
use stepflow::engine::{ExecutionError, Result};

/// One call observed by a [`Recorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Click(Option<(i32, i32)>),
    Type(String),
    Capture,
    Read(PathBuf),
    Write(PathBuf),
    OpenWorkbook(PathBuf),
    SetCell {
        sheet: Option<String>,
        cell: String,
        value: CellValue,
    },
    SaveWorkbook,
    Mail(MailMessage),
    Locate(ElementQuery),
}

impl Event {
    /// Short name used when asserting on call order.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Click(_) => "click",
            Event::Type(_) => "type",
            Event::Capture => "capture",
            Event::Read(_) => "read",
            Event::Write(_) => "write",
            Event::OpenWorkbook(_) => "open_workbook",
            Event::SetCell { .. } => "set_cell",
            Event::SaveWorkbook => "save_workbook",
            Event::Mail(_) => "mail",
            Event::Locate(_) => "locate",
        }
    }
}

/// Capability double that records every call and succeeds unless told otherwise.
///
/// File operations go to the real filesystem so copies can be checked byte for byte.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    cursor: (i32, i32),
    fail_typing: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(mut self, x: i32, y: i32) -> Self {
        self.cursor = (x, y);
        self
    }

    /// Make every `type_text` call fail.
    pub fn failing_keyboard(mut self) -> Self {
        self.fail_typing = true;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        let shared = Arc::new(self.clone());
        Capabilities::files_only()
            .with_desktop(shared.clone())
            .with_screen(shared.clone())
            .with_files(shared.clone())
            .with_spreadsheets(shared.clone())
            .with_mail(shared.clone())
            .with_elements(shared)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::name).collect()
    }

    pub fn mails(&self) -> Vec<MailMessage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Mail(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl DesktopControl for Recorder {
    async fn click(&self, position: Option<(i32, i32)>) -> Result<()> {
        self.push(Event::Click(position));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.push(Event::Type(text.to_string()));
        if self.fail_typing {
            return Err(ExecutionError::CapabilityFailed {
                capability: "keyboard control",
                message: "keyboard unplugged".to_string(),
            });
        }
        Ok(())
    }

    async fn cursor_position(&self) -> Result<(i32, i32)> {
        Ok(self.cursor)
    }
}

#[async_trait]
impl ScreenCapture for Recorder {
    async fn capture(&self) -> Result<RgbaImage> {
        self.push(Event::Capture);
        Ok(RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255])))
    }
}

#[async_trait]
impl FileStore for Recorder {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.push(Event::Read(path.to_path_buf()));
        LocalFileStore.read_bytes(path).await
    }

    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.push(Event::Write(path.to_path_buf()));
        LocalFileStore.write_bytes(path, bytes).await
    }
}

struct RecordingWorkbook {
    recorder: Recorder,
}

impl Workbook for RecordingWorkbook {
    fn set_cell(&mut self, sheet: Option<&str>, cell: &str, value: &CellValue) -> Result<()> {
        self.recorder.push(Event::SetCell {
            sheet: sheet.map(str::to_string),
            cell: cell.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.recorder.push(Event::SaveWorkbook);
        Ok(())
    }
}

#[async_trait]
impl SpreadsheetStore for Recorder {
    async fn open_or_create(&self, path: &Path) -> Result<Box<dyn Workbook>> {
        self.push(Event::OpenWorkbook(path.to_path_buf()));
        Ok(Box::new(RecordingWorkbook {
            recorder: self.clone(),
        }))
    }
}

#[async_trait]
impl MailTransport for Recorder {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        self.push(Event::Mail(message.clone()));
        Ok(())
    }
}

#[async_trait]
impl ElementLocator for Recorder {
    async fn locate(&self, query: &ElementQuery) -> Result<ElementBounds> {
        self.push(Event::Locate(query.clone()));
        Ok(ElementBounds {
            left: 100,
            top: 200,
            right: 140,
            bottom: 220,
        })
    }
}

/// Builds JSON workflow descriptions step by step.
#[derive(Debug, Clone, Default)]
pub struct TestWorkflowBuilder {
    steps: Vec<Value>,
}

impl TestWorkflowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step_type: &str, payload: Value) -> Self {
        self.steps.push(json!({"type": step_type, "payload": payload}));
        self
    }

    pub fn bare(mut self, step_type: &str) -> Self {
        self.steps.push(json!({"type": step_type}));
        self
    }

    pub fn click(self) -> Self {
        self.bare("click")
    }

    pub fn click_at(self, x: i64, y: i64) -> Self {
        self.step("click", json!({"x": x, "y": y}))
    }

    pub fn input(self, text: &str) -> Self {
        self.step("input", json!({"text": text}))
    }

    pub fn condition(self, operator: &str, conditions: Value) -> Self {
        self.step("condition", json!({"operator": operator, "conditions": conditions}))
    }

    pub fn wait(self, seconds: Value) -> Self {
        self.step("wait", json!({"seconds": seconds}))
    }

    pub fn file_copy(self, src: &Path, dst: &Path) -> Self {
        self.step(
            "file_copy",
            json!({"src": src.to_string_lossy(), "dst": dst.to_string_lossy()}),
        )
    }

    pub fn repeat(mut self, count: Value, body: TestWorkflowBuilder) -> Self {
        let mut payload = Map::new();
        payload.insert("count".to_string(), count);
        payload.insert("steps".to_string(), body.build());
        self.steps.push(json!({"type": "loop", "payload": payload}));
        self
    }

    pub fn build(&self) -> Value {
        Value::Array(self.steps.clone())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.build()).unwrap()
    }

    pub async fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.to_json()).await
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workflow_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.json", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_output.json", name))
    }

    pub async fn create_workflow_file(&self, name: &str, builder: &TestWorkflowBuilder) -> PathBuf {
        let workflow_file = self.workflow_file(name);
        builder
            .write_to_file(&workflow_file)
            .await
            .expect("Failed to write workflow file");
        workflow_file
    }

    pub async fn create_raw_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content)
            .await
            .expect("Failed to write fixture file");
        path
    }
}

pub async fn read_json_output(
    file_path: &Path,
) -> std::result::Result<Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path).await?;
    let json: Value = serde_json::from_str(&content)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_builder() {
        let json = TestWorkflowBuilder::new()
            .click_at(1, 2)
            .repeat(json!(2), TestWorkflowBuilder::new().input("hi"))
            .build();

        assert_eq!(json[0]["type"], "click");
        assert_eq!(json[0]["payload"]["x"], 1);
        assert_eq!(json[1]["payload"]["count"], 2);
        assert_eq!(json[1]["payload"]["steps"][0]["payload"]["text"], "hi");
    }

    #[test]
    fn test_environment_setup() {
        let env = TestEnvironment::new();
        assert!(env.path().exists());
        assert!(env
            .workflow_file("test")
            .to_string_lossy()
            .ends_with("test.json"));
    }
}
