use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use upkeep_core::config::EmailConfig;

use crate::brevo::BrevoNotifier;
use crate::error::NotifyError;

/// One overdue-task email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueReminder {
    pub recipient: String,
    pub task_title: String,
    pub days_overdue: i64,
}

/// Transactional email sender.
///
/// `Ok(())` means the provider accepted the message; any error means it was
/// not sent and the caller must not record it.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send_overdue(&self, reminder: &OverdueReminder) -> Result<(), NotifyError>;
}

/// Used when `email.api_key` is unset.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn send_overdue(&self, reminder: &OverdueReminder) -> Result<(), NotifyError> {
        warn!(task = %reminder.task_title, "email not configured, reminder not sent");
        Err(NotifyError::NotConfigured(
            "set email.api_key (UPKEEP_EMAIL__API_KEY) to enable reminders".into(),
        ))
    }
}

/// Build the notifier described by `config`.
pub fn build_notifier(config: &EmailConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => {
            let notifier = BrevoNotifier::from_config(config)?;
            info!(
                base_url = %config.base_url,
                sender = %config.sender_email,
                "email notifier: Brevo"
            );
            Ok(Arc::new(notifier))
        }
        _ => {
            warn!("no email API key configured; overdue reminders will not be delivered");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}
