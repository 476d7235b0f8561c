//! Error types for the finance chatbot

use thiserror::Error;

/// Result type alias for chatbot operations
pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {

    // =============================
    // Core Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("{service} returned status {status}")]
    UpstreamStatus { service: &'static str, status: u16 },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Chart error: {0}")]
    ChartError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
