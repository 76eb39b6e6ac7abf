// ABOUTME: Capability interfaces the step handlers call into
// ABOUTME: Pointer/keyboard, screen, files, spreadsheets, mail and element lookup providers

pub mod capture;
pub mod desktop;
pub mod files;
pub mod image_match;
pub mod mail;
pub mod spreadsheet;

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::engine::error::{ExecutionError, Result};

pub use capture::{fetch_web_element, ElementCaptureServer};
pub use files::LocalFileStore;
pub use image_match::{match_template, match_template_files, TemplateMatch};
pub use mail::{MailMessage, SmtpMailer};
pub use spreadsheet::parse_cell_reference;

#[async_trait]
pub trait DesktopControl: Send + Sync {
    /// Click the primary button, at `position` when given, otherwise where the pointer is.
    async fn click(&self, position: Option<(i32, i32)>) -> Result<()>;
    async fn type_text(&self, text: &str) -> Result<()>;
    async fn cursor_position(&self) -> Result<(i32, i32)>;
}

#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self) -> Result<RgbaImage>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<&serde_json::Value> for CellValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

pub trait Workbook: Send {
    /// Set `cell` (A1 notation) on the named sheet, or on the active sheet when `sheet` is `None`.
    fn set_cell(&mut self, sheet: Option<&str>, cell: &str, value: &CellValue) -> Result<()>;
    fn save(&mut self) -> Result<()>;
}

#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    /// Open the workbook at `path`, or start a new one that will be saved there.
    async fn open_or_create(&self, path: &Path) -> Result<Box<dyn Workbook>>;
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Attributes identifying a native UI element, e.g. `AutomationId` or `Name`.
pub type ElementQuery = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ElementBounds {
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

#[async_trait]
pub trait ElementLocator: Send + Sync {
    async fn locate(&self, query: &ElementQuery) -> Result<ElementBounds>;
}

/// Stand-in for a provider that this build or platform does not ship.
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self, capability: &'static str) -> ExecutionError {
        ExecutionError::CapabilityUnavailable {
            capability,
            reason: self.reason.clone(),
        }
    }
}

#[async_trait]
impl DesktopControl for Unavailable {
    async fn click(&self, _position: Option<(i32, i32)>) -> Result<()> {
        Err(self.error("pointer control"))
    }

    async fn type_text(&self, _text: &str) -> Result<()> {
        Err(self.error("keyboard control"))
    }

    async fn cursor_position(&self) -> Result<(i32, i32)> {
        Err(self.error("pointer control"))
    }
}

#[async_trait]
impl ScreenCapture for Unavailable {
    async fn capture(&self) -> Result<RgbaImage> {
        Err(self.error("screen capture"))
    }
}

#[async_trait]
impl SpreadsheetStore for Unavailable {
    async fn open_or_create(&self, _path: &Path) -> Result<Box<dyn Workbook>> {
        Err(self.error("spreadsheet store"))
    }
}

#[async_trait]
impl MailTransport for Unavailable {
    async fn send(&self, _message: &MailMessage) -> Result<()> {
        Err(self.error("mail transport"))
    }
}

#[async_trait]
impl ElementLocator for Unavailable {
    async fn locate(&self, _query: &ElementQuery) -> Result<ElementBounds> {
        Err(self.error("element lookup"))
    }
}

/// The set of providers a workflow run may call into.
#[derive(Clone)]
pub struct Capabilities {
    pub desktop: Arc<dyn DesktopControl>,
    pub screen: Arc<dyn ScreenCapture>,
    pub files: Arc<dyn FileStore>,
    pub spreadsheets: Arc<dyn SpreadsheetStore>,
    pub mail: Arc<dyn MailTransport>,
    pub elements: Arc<dyn ElementLocator>,
}

impl Capabilities {
    /// Providers available in this build: native desktop and spreadsheet support
    /// depend on the `desktop` and `excel` features.
    pub fn native(smtp_port: u16) -> Self {
        Self {
            desktop: desktop::native_control(),
            screen: desktop::native_screen(),
            files: Arc::new(LocalFileStore),
            spreadsheets: spreadsheet::native_store(),
            mail: Arc::new(SmtpMailer::new(smtp_port)),
            elements: Arc::new(Unavailable::new(
                "native UI element lookup is not supported on this platform",
            )),
        }
    }

    /// Only the local file store; every other provider reports itself unavailable.
    pub fn files_only() -> Self {
        let unavailable = Arc::new(Unavailable::new("not configured"));
        Self {
            desktop: unavailable.clone(),
            screen: unavailable.clone(),
            files: Arc::new(LocalFileStore),
            spreadsheets: unavailable.clone(),
            mail: unavailable.clone(),
            elements: unavailable,
        }
    }

    pub fn with_desktop(mut self, desktop: Arc<dyn DesktopControl>) -> Self {
        self.desktop = desktop;
        self
    }

    pub fn with_screen(mut self, screen: Arc<dyn ScreenCapture>) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = files;
        self
    }

    pub fn with_spreadsheets(mut self, spreadsheets: Arc<dyn SpreadsheetStore>) -> Self {
        self.spreadsheets = spreadsheets;
        self
    }

    pub fn with_mail(mut self, mail: Arc<dyn MailTransport>) -> Self {
        self.mail = mail;
        self
    }

    pub fn with_elements(mut self, elements: Arc<dyn ElementLocator>) -> Self {
        self.elements = elements;
        self
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish()
    }
}
