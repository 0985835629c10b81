use thiserror::Error;
use upkeep_store::StoreError;

/// Errors that can occur within the reminder subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Ledger or task query failed; aborts the whole run.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The cron expression could not be parsed.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// No usable recipient address was supplied.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
