use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email delivery is not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the email provider.
    #[error("email API error ({status}): {message}")]
    Api { status: u16, message: String },
}
