use chrono::{Days, NaiveDate};

use crate::error::{CoreError, Result};
use crate::types::validate_due_date;

/// Next due date after a completion on `today`.
///
/// Anchored to the completion day, not to the previous due date: a task
/// finished late restarts its cadence from the day it was done.
pub fn next_due(today: NaiveDate, frequency_days: u32) -> Result<NaiveDate> {
    if frequency_days == 0 {
        return Err(CoreError::InvalidFrequency { days: 0 });
    }
    let next = today
        .checked_add_days(Days::new(u64::from(frequency_days)))
        .ok_or_else(|| CoreError::DateOutOfRange(format!("{today} + {frequency_days} days")))?;
    validate_due_date(next)
}
