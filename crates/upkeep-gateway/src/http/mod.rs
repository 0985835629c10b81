pub mod health;
pub mod logs;
pub mod reminders;
pub mod tasks;
