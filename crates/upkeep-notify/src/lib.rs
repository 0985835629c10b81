//! `upkeep-notify`: outbound overdue-task emails.
//!
//! The reminder pipeline only sees the [`Notifier`] trait. [`BrevoNotifier`]
//! talks to the Brevo transactional email API; [`DisabledNotifier`] stands in
//! when no API key is configured so that every send is reported as failed
//! (and therefore retried on a later trigger) instead of silently dropped.

pub mod brevo;
pub mod email;
pub mod error;
pub mod notifier;

pub use brevo::BrevoNotifier;
pub use error::NotifyError;
pub use notifier::{build_notifier, DisabledNotifier, Notifier, OverdueReminder};
