use serde::Serialize;

use super::value::{FieldPath, Value};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Violation {
    path: FieldPath,
    message: String,
    invalid_value: Option<Value>,
}

impl Violation {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            invalid_value: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.invalid_value = Some(value);
        self
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn invalid_value(&self) -> Option<&Value> {
        self.invalid_value.as_ref()
    }
}

pub trait Constraint: Send + Sync {
    fn evaluate(&self, path: &FieldPath, value: &Value) -> Vec<Violation>;
}

impl<F> Constraint for F
where
    F: Fn(&FieldPath, &Value) -> Vec<Violation> + Send + Sync,
{
    fn evaluate(&self, path: &FieldPath, value: &Value) -> Vec<Violation> {
        (self)(path, value)
    }
}

#[derive(Clone, Debug)]
pub struct NotBlank {
    message: String,
}

impl NotBlank {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Constraint for NotBlank {
    fn evaluate(&self, path: &FieldPath, value: &Value) -> Vec<Violation> {
        if value.is_blank() {
            vec![Violation::new(path.clone(), self.message.clone())]
        } else {
            Vec::new()
        }
    }
}

#[derive(Clone, Debug)]
pub struct MinLength {
    min: usize,
    message: String,
}

impl MinLength {
    pub fn new(min: usize, message: impl Into<String>) -> Self {
        Self {
            min,
            message: message.into(),
        }
    }
}

impl Constraint for MinLength {
    fn evaluate(&self, path: &FieldPath, value: &Value) -> Vec<Violation> {
        let Some(text) = value.as_text() else {
            return Vec::new();
        };
        if text.trim().is_empty() || text.chars().count() >= self.min {
            return Vec::new();
        }
        vec![Violation::new(path.clone(), self.message.clone()).with_value(value.clone())]
    }
}

#[derive(Clone, Debug)]
pub struct EmailFormat {
    message: String,
}

impl EmailFormat {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Constraint for EmailFormat {
    fn evaluate(&self, path: &FieldPath, value: &Value) -> Vec<Violation> {
        let Some(text) = value.as_text() else {
            return Vec::new();
        };
        if text.trim().is_empty() || looks_like_email(text) {
            return Vec::new();
        }
        vec![Violation::new(path.clone(), self.message.clone()).with_value(value.clone())]
    }
}

fn looks_like_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.split('.').count() >= 2 && domain.split('.').all(|label| !label.is_empty())
}

#[derive(Clone, Debug)]
pub struct OneOf {
    allowed: Vec<Value>,
    message: String,
}

impl OneOf {
    pub fn new(allowed: Vec<Value>, message: impl Into<String>) -> Self {
        Self {
            allowed,
            message: message.into(),
        }
    }
}

impl Constraint for OneOf {
    fn evaluate(&self, path: &FieldPath, value: &Value) -> Vec<Violation> {
        if value.is_blank() || self.allowed.contains(value) {
            return Vec::new();
        }
        vec![Violation::new(path.clone(), self.message.clone()).with_value(value.clone())]
    }
}
