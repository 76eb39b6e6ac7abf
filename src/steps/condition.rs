// ABOUTME: Condition step handler and boolean expression evaluation
// ABOUTME: Combines a list of expressions with `and` or `or`, recursing into nested expressions

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use super::StepHandler;
use crate::engine::error::{ExecutionError, Result};
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    /// Parse a combinator name; absent means `and`.
    pub fn parse(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Operator::And),
            Some(Value::String(name)) => match name.trim().to_ascii_lowercase().as_str() {
                "and" => Ok(Operator::And),
                "or" => Ok(Operator::Or),
                _ => Err(ExecutionError::InvalidOperator {
                    operator: name.clone(),
                }),
            },
            Some(other) => Err(ExecutionError::InvalidOperator {
                operator: other.to_string(),
            }),
        }
    }

    /// `and` over nothing is true, `or` over nothing is false.
    pub fn combine(self, values: impl IntoIterator<Item = bool>) -> bool {
        let mut values = values.into_iter();
        match self {
            Operator::And => values.all(|v| v),
            Operator::Or => values.any(|v| v),
        }
    }
}

/// Evaluate a condition payload: `operator` over `conditions`, or a lone `condition`.
pub fn evaluate(params: &Map<String, Value>) -> Result<bool> {
    let operator = Operator::parse(params.get("operator"))?;

    let expressions: Vec<&Value> = match (params.get("conditions"), params.get("condition")) {
        (Some(Value::Array(items)), _) => items.iter().collect(),
        (Some(single), _) => vec![single],
        (None, Some(single)) => vec![single],
        (None, None) => {
            return Err(ExecutionError::MissingParameter {
                step_type: StepType::Condition,
                parameter: "conditions".to_string(),
            })
        }
    };

    // Every expression is evaluated so a malformed entry is never masked by short-circuiting.
    let values = expressions
        .into_iter()
        .enumerate()
        .map(|(position, expression)| truth(expression, position))
        .collect::<Result<Vec<bool>>>()?;

    Ok(operator.combine(values))
}

fn truth(expression: &Value, position: usize) -> Result<bool> {
    match expression {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(invalid(position, format!("'{}' is not a boolean", s))),
        },
        Value::Object(nested) if nested.contains_key("conditions") || nested.contains_key("condition") => {
            evaluate(nested)
        }
        other => Err(invalid(position, format!("cannot evaluate {} as a condition", other))),
    }
}

fn invalid(position: usize, reason: String) -> ExecutionError {
    ExecutionError::InvalidParameter {
        step_type: StepType::Condition,
        parameter: format!("conditions[{}]", position),
        reason,
    }
}

pub struct ConditionStep;

#[async_trait]
impl StepHandler for ConditionStep {
    fn step_type(&self) -> StepType {
        StepType::Condition
    }

    async fn execute(&self, step: &Step, _scope: &StepScope<'_>) -> Result<StepOutcome> {
        info!("Executing condition step");
        let result = evaluate(step.payload().params())?;
        info!("Condition evaluated: {}", result);
        Ok(StepOutcome::Evaluated(result))
    }
}
