use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    RateProviderError(String),
    DatabaseError(String),
    StreamError(String),
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::RateProviderError(msg) => write!(f, "Rate provider error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::StreamError(msg) => write!(f, "Stream processing failed: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Message without the category prefix, for diagnostics embedded in
    /// row-level error strings.
    pub fn message(&self) -> &str {
        match self {
            AppError::Internal(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::RateProviderError(msg)
            | AppError::DatabaseError(msg)
            | AppError::StreamError(msg)
            | AppError::IoError(msg) => msg,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
