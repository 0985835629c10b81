use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request field failed validation. `field` is reported back to the client.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("frequency_days must be between 1 and 36500 (got {days})")]
    InvalidFrequency { days: i64 },

    #[error("date out of range: {0}")]
    DateOutOfRange(String),
}

impl CoreError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
