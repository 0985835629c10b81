use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulerError};

/// Cron schedule for the reminder timer, evaluated in UTC.
///
/// Accepts classic 5-field expressions (`min hour dom mon dow`, as in
/// `0 8 * * *`) as well as the 6/7-field form with a leading seconds field.
#[derive(Debug, Clone)]
pub struct ReminderSchedule {
    expression: String,
    inner: cron::Schedule,
}

impl ReminderSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(SchedulerError::InvalidSchedule(
                "cron expression cannot be empty".to_string(),
            ));
        }
        let normalized = if trimmed.split_whitespace().count() == 5 {
            format!("0 {trimmed}")
        } else {
            trimmed.to_string()
        };
        let inner = cron::Schedule::from_str(&normalized).map_err(|e| {
            SchedulerError::InvalidSchedule(format!("invalid cron expression '{trimmed}': {e}"))
        })?;
        Ok(Self {
            expression: trimmed.to_string(),
            inner,
        })
    }

    /// The expression as configured.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire time strictly after `from`.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner.after(&from).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn five_field_expression_gets_seconds() {
        let schedule = ReminderSchedule::parse("0 8 * * *").unwrap();
        assert_eq!(schedule.expression(), "0 8 * * *");

        let from = Utc.with_ymd_and_hms(2024, 1, 10, 7, 59, 0).unwrap();
        assert_eq!(
            schedule.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn passed_window_rolls_to_next_day() {
        let schedule = ReminderSchedule::parse("0 8 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 1, 11, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn six_field_expression_is_used_as_is() {
        let schedule = ReminderSchedule::parse("30 15 6 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 1, 11, 6, 15, 30).unwrap())
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            ReminderSchedule::parse("every morning"),
            Err(SchedulerError::InvalidSchedule(_))
        ));
        assert!(matches!(
            ReminderSchedule::parse("   "),
            Err(SchedulerError::InvalidSchedule(_))
        ));
    }
}
