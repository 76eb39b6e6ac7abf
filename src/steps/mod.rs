// ABOUTME: Built-in step handlers and the registry the executor dispatches through
// ABOUTME: One handler per step type; unregistered types fail at dispatch time

pub mod condition;
pub mod desktop;
pub mod excel;
pub mod file_copy;
pub mod loop_step;
pub mod notify;
pub mod params;
pub mod screenshot;
pub mod wait;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::engine::error::Result;
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

#[async_trait]
pub trait StepHandler: Send + Sync {
    fn step_type(&self) -> StepType;

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome>;
}

pub struct StepRegistry {
    handlers: HashMap<StepType, Box<dyn StepHandler>>,
}

impl StepRegistry {
    /// An empty registry; every step type is unhandled until registered.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(desktop::ClickStep));
        registry.register(Box::new(desktop::InputStep));
        registry.register(Box::new(screenshot::ScreenshotStep));
        registry.register(Box::new(file_copy::FileCopyStep));
        registry.register(Box::new(excel::ExcelWriteStep));
        registry.register(Box::new(condition::ConditionStep));
        registry.register(Box::new(loop_step::LoopStep));
        registry.register(Box::new(wait::WaitStep));
        registry.register(Box::new(notify::NotifyStep));

        registry
    }

    /// Register a handler, replacing any previous one for the same type.
    pub fn register(&mut self, handler: Box<dyn StepHandler>) {
        self.handlers.insert(handler.step_type(), handler);
    }

    pub fn get(&self, step_type: StepType) -> Option<&dyn StepHandler> {
        self.handlers.get(&step_type).map(|h| h.as_ref())
    }

    pub fn supported_types(&self) -> Vec<StepType> {
        StepType::ALL
            .into_iter()
            .filter(|t| self.handlers.contains_key(t))
            .collect()
    }

    pub fn missing_types(&self) -> Vec<StepType> {
        StepType::ALL
            .into_iter()
            .filter(|t| !self.handlers.contains_key(t))
            .collect()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
