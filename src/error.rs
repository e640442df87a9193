//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Config or secret source could not be read; aborts a run before any mutation
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// Fetching one series/channel from the statistics API failed
    #[error("Fetch failed for {series_id}/{channel}: {reason}")]
    FetchFailed {
        series_id: String,
        channel: String,
        reason: String,
    },

    #[error("Invalid numeric value: {value:?}")]
    InvalidNumericFormat { value: String },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Mail transport failed: {0}")]
    MailTransportFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Serializable error response for API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::ConfigUnavailable(_) => "CONFIG_UNAVAILABLE",
            AppError::FetchFailed { .. } => "FETCH_FAILED",
            AppError::InvalidNumericFormat { .. } => "INVALID_NUMERIC_FORMAT",
            AppError::Store(_) => "STORE_UNAVAILABLE",
            AppError::MailTransportFailed(_) => "MAIL_TRANSPORT_FAILED",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Keychain(_) => "KEYCHAIN_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
