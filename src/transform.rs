use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::value::Value;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransformError {
    message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn invalid() -> Self {
        Self::new("this value is not valid")
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for TransformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransformError {}

pub trait DataTransformer: Send + Sync {
    fn to_external(&self, value: &Value) -> Value;
    fn to_internal(&self, value: &Value) -> Result<Value, TransformError>;
}

pub(crate) fn externalize(chain: &[Arc<dyn DataTransformer>], value: &Value) -> Value {
    chain
        .iter()
        .fold(value.clone(), |current, step| step.to_external(&current))
}

pub(crate) fn internalize(
    chain: &[Arc<dyn DataTransformer>],
    value: &Value,
) -> Result<Value, TransformError> {
    // Reverse chain order: display and submit directions invert at chain level.
    let mut current = value.clone();
    for step in chain.iter().rev() {
        current = step.to_internal(&current)?;
    }
    Ok(current)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Trim;

impl DataTransformer for Trim {
    fn to_external(&self, value: &Value) -> Value {
        value.clone()
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TransformError> {
        Ok(match value {
            Value::Text(text) => Value::text(text.trim()),
            other => other.clone(),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CanonicalCase {
    Upper,
    Lower,
}

// Mixed-case submissions collapse to the canonical form; only the display
// direction is idempotent.
#[derive(Clone, Copy, Debug)]
pub struct CaseCanonicalizer {
    canonical: CanonicalCase,
}

impl CaseCanonicalizer {
    pub fn new(canonical: CanonicalCase) -> Self {
        Self { canonical }
    }

    pub fn upper() -> Self {
        Self::new(CanonicalCase::Upper)
    }

    pub fn lower() -> Self {
        Self::new(CanonicalCase::Lower)
    }
}

impl DataTransformer for CaseCanonicalizer {
    fn to_external(&self, value: &Value) -> Value {
        match value {
            Value::Text(text) => Value::text(title_case(text)),
            other => other.clone(),
        }
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TransformError> {
        Ok(match value {
            Value::Text(text) => Value::text(match self.canonical {
                CanonicalCase::Upper => text.to_uppercase(),
                CanonicalCase::Lower => text.to_lowercase(),
            }),
            other => other.clone(),
        })
    }
}

fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_whitespace() || ch == '-' {
            at_word_start = true;
            result.push(ch);
        } else if at_word_start {
            at_word_start = false;
            result.extend(ch.to_uppercase());
        } else {
            result.extend(ch.to_lowercase());
        }
    }
    result
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CheckboxTransformer;

impl DataTransformer for CheckboxTransformer {
    fn to_external(&self, value: &Value) -> Value {
        match value {
            Value::Bool(true) => Value::text("1"),
            _ => Value::Null,
        }
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TransformError> {
        match value {
            Value::Null => Ok(Value::Bool(false)),
            Value::Bool(checked) => Ok(Value::Bool(*checked)),
            Value::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "on" | "true" | "yes" => Ok(Value::Bool(true)),
                "" | "0" | "off" | "false" | "no" => Ok(Value::Bool(false)),
                _ => Err(TransformError::new("this value is not a valid checkbox value")),
            },
            _ => Err(TransformError::new("this value is not a valid checkbox value")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NumberTransformer;

impl DataTransformer for NumberTransformer {
    fn to_external(&self, value: &Value) -> Value {
        match value {
            Value::Number(number) => Value::text(number.to_string()),
            other => other.clone(),
        }
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TransformError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Number(number) => Ok(Value::Number(*number)),
            Value::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                Decimal::from_str(trimmed)
                    .map(Value::Number)
                    .map_err(|_| TransformError::new("this value is not a valid number"))
            }
            _ => Err(TransformError::new("this value is not a valid number")),
        }
    }
}
