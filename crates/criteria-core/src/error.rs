//! Error types for Criteria Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Unknown verdict: {0}")]
    UnknownVerdict(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownOperator("approx".to_string());
        assert_eq!(err.to_string(), "Unknown operator: approx");

        let err = CoreError::InvalidValue("NaN".to_string());
        assert!(err.to_string().contains("Invalid value"));
    }
}
