use rusqlite::Connection;

use crate::error::Result;

/// Initialise the maintenance schema in `conn`.
///
/// Safe to call on every startup; uses `IF NOT EXISTS` throughout.
/// Foreign keys must be enabled on the connection for the cascades to fire.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS maintenance_tasks (
            id              TEXT    NOT NULL PRIMARY KEY,
            title           TEXT    NOT NULL CHECK (length(trim(title)) > 0),
            description     TEXT,
            frequency_days  INTEGER NOT NULL DEFAULT 7 CHECK (frequency_days >= 1),
            next_due_date   INTEGER NOT NULL,   -- day number, 0001-01-01 = 1
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        ) STRICT;

        -- Overdue scan: WHERE is_active = 1 AND next_due_date < ?
        -- Integer days compare correctly for every representable date.
        CREATE INDEX IF NOT EXISTS idx_tasks_active_due
            ON maintenance_tasks (is_active, next_due_date);

        CREATE TABLE IF NOT EXISTS maintenance_logs (
            id              TEXT    NOT NULL PRIMARY KEY,
            task_id         TEXT    NOT NULL
                            REFERENCES maintenance_tasks (id) ON DELETE CASCADE,
            completed_by    TEXT    NOT NULL,
            notes           TEXT,
            completed_at    TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_logs_completed_at
            ON maintenance_logs (completed_at DESC);
        CREATE INDEX IF NOT EXISTS idx_logs_task
            ON maintenance_logs (task_id);

        CREATE TABLE IF NOT EXISTS email_reminders (
            id              TEXT    NOT NULL PRIMARY KEY,
            task_id         TEXT    NOT NULL
                            REFERENCES maintenance_tasks (id) ON DELETE CASCADE,
            recipient_email TEXT    NOT NULL,
            days_overdue    INTEGER NOT NULL CHECK (days_overdue >= 1),
            sent_at         TEXT    NOT NULL,
            sent_on         TEXT    NOT NULL,   -- UTC calendar day of sent_at
            UNIQUE (task_id, sent_on)
        ) STRICT;
        ",
    )?;
    Ok(())
}
