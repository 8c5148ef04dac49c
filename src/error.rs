use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl BenchError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        BenchError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for payload decoding failures (malformed `data` text).
    pub fn is_decode(&self) -> bool {
        matches!(self, BenchError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
