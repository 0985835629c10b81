//! Overdue reminder email rendering.

use crate::notifier::OverdueReminder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn overdue_email(reminder: &OverdueReminder) -> EmailContent {
    let days = reminder.days_overdue;
    let title = &reminder.task_title;
    let html = format!(
        "<h2>Maintenance Task Reminder</h2>\
         <p>Hello,</p>\
         <p>The following maintenance task is <strong>{days} day(s) overdue</strong>:</p>\
         <p><strong>{}</strong></p>\
         <p>Please complete this task as soon as possible.</p>\
         <p>Best regards,<br>Maintenance Team</p>",
        escape_html(title)
    );
    let text = format!(
        "Maintenance Task Reminder\n\n\
         The following maintenance task is {days} day(s) overdue:\n\
         {title}\n\n\
         Please complete this task as soon as possible.\n\n\
         Best regards,\n\
         Maintenance Team\n"
    );
    EmailContent {
        subject: format!("[OVERDUE] Maintenance Task: {title}"),
        html,
        text,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
