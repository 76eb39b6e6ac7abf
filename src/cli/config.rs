// ABOUTME: Configuration management for stepflow
// ABOUTME: Loads YAML configuration from standard locations and applies environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capabilities::capture::{DEFAULT_CAPTURE_HOST, DEFAULT_CAPTURE_PORT};
use crate::engine::executor::{DEFAULT_FROM_ADDR, DEFAULT_MAX_DEPTH, DEFAULT_SMTP_SERVER};
use crate::engine::ExecutorSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub smtp: SmtpConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: Option<String>,
    pub port: u16,
    pub from_addr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub host: String,
    pub port: u16,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: 25,
            from_addr: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CAPTURE_HOST.to_string(),
            port: DEFAULT_CAPTURE_PORT,
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            _ => Config::default(),
        };

        config.merge_env()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local = [
            "stepflow.yaml",
            "stepflow.yml",
            ".stepflow.yaml",
            ".stepflow.yml",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists());

        local.or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".stepflow").join("config.yaml"))
                .filter(|path| path.exists())
        })
    }

    fn merge_env(&mut self) -> Result<()> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        // Logging configuration
        if let Some(level) = lookup("STEPFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("STEPFLOW_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(depth) = lookup("STEPFLOW_MAX_DEPTH") {
            self.engine.max_depth = depth
                .parse()
                .with_context(|| format!("Invalid STEPFLOW_MAX_DEPTH '{}'", depth))?;
        }

        // SMTP configuration
        if let Some(server) = lookup("SMTP_SERVER") {
            self.smtp.server = Some(server);
        }
        if let Some(port) = lookup("SMTP_PORT") {
            self.smtp.port = port
                .parse()
                .with_context(|| format!("Invalid SMTP_PORT '{}'", port))?;
        }
        if let Some(from) = lookup("SMTP_FROM") {
            self.smtp.from_addr = Some(from);
        }

        // Element capture listener
        if let Some(host) = lookup("STEPFLOW_CAPTURE_HOST") {
            self.capture.host = host;
        }
        if let Some(port) = lookup("STEPFLOW_CAPTURE_PORT") {
            self.capture.port = port
                .parse()
                .with_context(|| format!("Invalid STEPFLOW_CAPTURE_PORT '{}'", port))?;
        }

        Ok(())
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            max_depth: self.engine.max_depth,
            smtp_server: self
                .smtp
                .server
                .clone()
                .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            from_addr: self
                .smtp
                .from_addr
                .clone()
                .unwrap_or_else(|| DEFAULT_FROM_ADDR.to_string()),
        }
    }
}
