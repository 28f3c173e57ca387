//! Error types for the lead scoring service.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Credential and bearer-token errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,
}

/// Errors turning an uploaded file into a record set.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("File must be a CSV (got {file_name:?})")]
    InvalidInputFormat { file_name: Option<String> },

    #[error("Input has no header row")]
    Empty,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row} has {found} fields but the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl IngestError {
    /// Whether the caller sent the wrong kind of file, as opposed to a broken one.
    pub fn is_format_rejection(&self) -> bool {
        matches!(self, Self::InvalidInputFormat { .. })
    }
}

/// Errors specific to one output sink.
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("Failed to render workbook: {0}")]
    Render(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),

    #[error("Mail delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("{sink} is not configured")]
    NotConfigured { sink: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_rejection_is_distinguished_from_parse_failure() {
        let rejected = IngestError::InvalidInputFormat {
            file_name: Some("leads.txt".into()),
        };
        assert!(rejected.is_format_rejection());
        assert!(!IngestError::Empty.is_format_rejection());
    }
}
