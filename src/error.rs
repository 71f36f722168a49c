use std::fmt;
use thiserror::Error;

/// A single failed field check, reported back to the form that submitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("'{name}' already exists")]
    AlreadyExists { name: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Cannot delete: {reason}")]
    DeleteFailed { reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    /// Field-level messages for validation failures, empty for every other kind.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AppError::Validation(errors) => errors,
            AppError::AlreadyExists { .. }
            | AppError::NotFound { .. }
            | AppError::InvalidInput { .. }
            | AppError::InvalidTimestamp { .. }
            | AppError::DeleteFailed { .. }
            | AppError::Database(_)
            | AppError::Serialization(_)
            | AppError::Storage(_)
            | AppError::Config(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_field() {
        let err = AppError::Validation(vec![
            FieldError::new("title", "cannot be empty"),
            FieldError::new("endTime", "must be after the start time"),
        ]);

        assert_eq!(
            err.to_string(),
            "Validation failed: title: cannot be empty; endTime: must be after the start time"
        );
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn test_field_errors_empty_for_other_kinds() {
        let err = AppError::NotFound { entity: "Schedule", id: "42".into() };
        assert!(err.field_errors().is_empty());
        assert_eq!(err.to_string(), "Schedule '42' not found");
    }
}
