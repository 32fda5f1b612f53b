use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

/// One violated field constraint, with enough detail for a client-facing
/// message: the field, what was required, and the offending value.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Violation {
    pub field: String,
    pub constraint: String,
    pub value: JsonValue,
}

impl Violation {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>, value: JsonValue) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
            value,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (got {})", self.field, self.constraint, self.value)
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<Violation>),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("record '{0}' already exists")]
    DuplicateIdentifier(String),

    #[error("record '{0}' not found")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage write failed: {0}")]
    StorageWriteError(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
