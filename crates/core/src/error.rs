//! Error types for the Prompt Iteration Assistant.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, prompt loading, message validation,
//! variable resolution, and serialization.

use thiserror::Error;

/// Unified error type for the Prompt Iteration Assistant.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Lenient operations (placeholder substitution, front matter parsing) do not
/// produce errors at all; they degrade instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt definition and loading errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A message does not match the shape required by its role
    #[error("Validation error: {0}")]
    Validation(String),

    /// A prompt compiled with bound variables accessed a variable that was not bound
    #[error("Variable {variable} not found for prompt {prompt}")]
    MissingVariable { variable: String, prompt: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Shorthand for a missing variable error.
    pub fn missing_variable(variable: impl Into<String>, prompt: impl Into<String>) -> Self {
        AppError::MissingVariable {
            variable: variable.into(),
            prompt: prompt.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable_message() {
        let err = AppError::missing_variable("name", "Greeting");
        assert_eq!(err.to_string(), "Variable name not found for prompt Greeting");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
