// ABOUTME: Lenient payload decoding shared by step handlers
// ABOUTME: Coerces loosely typed JSON scalars into the shapes each handler needs

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::engine::error::{ExecutionError, Result};
use crate::parser::{Step, StepType};

/// Decode a step's payload into its typed parameter struct.
pub fn decode<T: DeserializeOwned>(step: &Step) -> Result<T> {
    let params = Value::Object(step.payload().params().clone());
    serde_json::from_value(params).map_err(|e| ExecutionError::InvalidParameter {
        step_type: step.step_type(),
        parameter: "payload".to_string(),
        reason: e.to_string(),
    })
}

/// Return the value of a required string parameter, treating empty as absent.
pub fn required(step_type: StepType, name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ExecutionError::MissingParameter {
            step_type,
            parameter: name.to_string(),
        }),
    }
}

/// Clamp a coerced integer to a non-negative count.
pub fn non_negative(value: Option<i64>) -> u64 {
    value.map(|v| v.max(0) as u64).unwrap_or(0)
}

/// Deserialize an optional integer from a number (fractions truncate) or a numeric string.
pub fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientIntVisitor;

    impl<'de> Visitor<'de> for LenientIntVisitor {
        type Value = Option<i64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer, a number, or a numeric string")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Self::Value, E> {
            Ok(Some(i64::try_from(value).unwrap_or(i64::MAX)))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Self::Value, E> {
            if value.is_finite() {
                Ok(Some(value.trunc() as i64))
            } else {
                Err(E::custom(format!("{} is not a finite number", value)))
            }
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if let Ok(parsed) = trimmed.parse::<i64>() {
                return Ok(Some(parsed));
            }
            match trimmed.parse::<f64>() {
                Ok(parsed) => self.visit_f64(parsed),
                Err(_) => Err(E::custom(format!("'{}' is not a number", value))),
            }
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(LenientIntVisitor)
}

/// Deserialize an optional string from a string, number, or boolean.
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a scalar value, found {}",
            other
        ))),
    }
}
