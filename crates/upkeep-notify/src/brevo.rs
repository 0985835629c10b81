use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};
use upkeep_core::config::EmailConfig;

use crate::email::overdue_email;
use crate::error::NotifyError;
use crate::notifier::{Notifier, OverdueReminder};

/// Brevo (ex-Sendinblue) transactional email API client.
pub struct BrevoNotifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    sender: Contact,
}

#[derive(Debug, Clone, Serialize)]
struct Contact {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: &'a Contact,
    to: Vec<Contact>,
    subject: String,
    html_content: String,
    text_content: String,
}

impl BrevoNotifier {
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| NotifyError::NotConfigured("email.api_key is not set".into()))?;
        // Request timeout: a hung provider counts as an ordinary send failure.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            sender: Contact {
                email: config.sender_email.clone(),
                name: Some(config.sender_name.clone()),
            },
        })
    }

    fn build_request<'a>(&'a self, reminder: &OverdueReminder) -> SendEmailRequest<'a> {
        let content = overdue_email(reminder);
        SendEmailRequest {
            sender: &self.sender,
            to: vec![Contact {
                email: reminder.recipient.clone(),
                name: None,
            }],
            subject: content.subject,
            html_content: content.html,
            text_content: content.text,
        }
    }
}

#[async_trait]
impl Notifier for BrevoNotifier {
    fn name(&self) -> &str {
        "brevo"
    }

    async fn send_overdue(&self, reminder: &OverdueReminder) -> Result<(), NotifyError> {
        let url = format!("{}/v3/smtp/email", self.base_url);
        let body = self.build_request(reminder);

        debug!(
            task = %reminder.task_title,
            days = reminder.days_overdue,
            "sending reminder via Brevo"
        );

        let resp = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Brevo API error");
            return Err(NotifyError::Api {
                status,
                message: text,
            });
        }
        Ok(())
    }
}
