use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Datelike, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, types::Value, Connection, OptionalExtension};
use tracing::{debug, info, instrument};
use upkeep_core::{CompletionLog, LogEntry, NewTask, ReminderRecord, Task, TaskId, TaskPatch};
use uuid::Uuid;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::store::{Completion, DeleteSummary, ReminderClaim, TaskStore};

const TASK_COLUMNS: &str = "id, title, description, frequency_days, next_due_date, is_active,
     created_at, updated_at";

/// [`TaskStore`] backed by a single SQLite connection.
///
/// The connection sits behind a `Mutex`; every multi-statement operation
/// runs inside one transaction while the lock is held.
pub struct SqliteTaskStore {
    db: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Wrap an open connection, enabling foreign keys and running migrations.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file at `path` in WAL mode.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!(%path, "task store opened");
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskStore for SqliteTaskStore {
    #[instrument(skip(self))]
    fn list_tasks(&self, active_only: bool) -> Result<Vec<Task>> {
        let db = self.conn();
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM maintenance_tasks {filter}
             ORDER BY next_due_date ASC, created_at ASC"
        ))?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let db = self.conn();
        let task = db
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM maintenance_tasks WHERE id = ?1"),
                [id.as_str()],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    fn create_task(&self, new: NewTask) -> Result<Task> {
        let id = TaskId::new();
        let now = now_rfc3339();
        let db = self.conn();
        db.execute(
            "INSERT INTO maintenance_tasks
             (id, title, description, frequency_days, next_due_date, is_active,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id.as_str(),
                new.title,
                new.description,
                new.frequency_days,
                day_number(new.next_due_date),
                new.is_active,
                now
            ],
        )?;
        info!(task_id = %id, "task created");
        Ok(Task {
            id,
            title: new.title,
            description: new.description,
            frequency_days: new.frequency_days,
            next_due_date: new.next_due_date,
            is_active: new.is_active,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    #[instrument(skip(self, patch), fields(task_id = %id))]
    fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(title) = &patch.title {
            columns.push("title");
            values.push(Value::Text(title.clone()));
        }
        if let Some(description) = &patch.description {
            columns.push("description");
            values.push(description.clone().map_or(Value::Null, Value::Text));
        }
        if let Some(frequency) = patch.frequency_days {
            columns.push("frequency_days");
            values.push(Value::Integer(i64::from(frequency)));
        }
        if let Some(due) = patch.next_due_date {
            columns.push("next_due_date");
            values.push(Value::Integer(day_number(due)));
        }
        if let Some(active) = patch.is_active {
            columns.push("is_active");
            values.push(Value::Integer(i64::from(active)));
        }
        columns.push("updated_at");
        values.push(Value::Text(now_rfc3339()));

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        values.push(Value::Text(id.as_str().to_string()));
        let sql = format!(
            "UPDATE maintenance_tasks SET {assignments} WHERE id = ?{}",
            values.len()
        );

        let db = self.conn();
        let n = db.execute(&sql, rusqlite::params_from_iter(values))?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        let task = db.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM maintenance_tasks WHERE id = ?1"),
            [id.as_str()],
            row_to_task,
        )?;
        debug!(fields = columns.len() - 1, "task updated");
        Ok(task)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    fn delete_task(&self, id: &TaskId) -> Result<DeleteSummary> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let logs_removed: i64 = tx.query_row(
            "SELECT COUNT(*) FROM maintenance_logs WHERE task_id = ?1",
            [id.as_str()],
            |row| row.get(0),
        )?;
        let reminders_removed: i64 = tx.query_row(
            "SELECT COUNT(*) FROM email_reminders WHERE task_id = ?1",
            [id.as_str()],
            |row| row.get(0),
        )?;
        // Logs and reminder records go with the task via ON DELETE CASCADE.
        let n = tx.execute("DELETE FROM maintenance_tasks WHERE id = ?1", [id.as_str()])?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        tx.commit()?;

        let summary = DeleteSummary {
            logs_removed: logs_removed as usize,
            reminders_removed: reminders_removed as usize,
        };
        info!(
            logs = summary.logs_removed,
            reminders = summary.reminders_removed,
            "task deleted"
        );
        Ok(summary)
    }

    #[instrument(
        skip(self, completion),
        fields(task_id = %id, next_due = %completion.next_due_date)
    )]
    fn complete_task(
        &self,
        id: &TaskId,
        completion: &Completion,
    ) -> Result<(Task, CompletionLog)> {
        let mut db = self.conn();
        let tx = db.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM maintenance_tasks WHERE id = ?1",
                [id.as_str()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        let log = CompletionLog {
            id: Uuid::now_v7().to_string(),
            task_id: id.clone(),
            completed_by: completion.completed_by.clone(),
            notes: completion.notes.clone(),
            completed_at: now_rfc3339(),
        };
        tx.execute(
            "INSERT INTO maintenance_logs (id, task_id, completed_by, notes, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.id,
                id.as_str(),
                log.completed_by,
                log.notes,
                log.completed_at
            ],
        )?;
        tx.execute(
            "UPDATE maintenance_tasks SET next_due_date = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                day_number(completion.next_due_date),
                log.completed_at,
                id.as_str()
            ],
        )?;
        let task = tx.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM maintenance_tasks WHERE id = ?1"),
            [id.as_str()],
            row_to_task,
        )?;
        // Dropping `tx` on any early return above rolls back the log insert.
        tx.commit()?;

        info!(log_id = %log.id, completed_by = %log.completed_by, "task completed");
        Ok((task, log))
    }

    #[instrument(skip(self))]
    fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT ml.id, ml.task_id, ml.completed_by, ml.notes, ml.completed_at, mt.title
             FROM maintenance_logs ml
             JOIN maintenance_tasks mt ON ml.task_id = mt.id
             ORDER BY ml.completed_at DESC, ml.id DESC
             LIMIT ?1",
        )?;
        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(LogEntry {
                    log: CompletionLog {
                        id: row.get(0)?,
                        task_id: TaskId(row.get(1)?),
                        completed_by: row.get(2)?,
                        notes: row.get(3)?,
                        completed_at: row.get(4)?,
                    },
                    task_title: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    #[instrument(skip(self))]
    fn overdue_tasks(&self, today: NaiveDate) -> Result<Vec<Task>> {
        let db = self.conn();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {TASK_COLUMNS} FROM maintenance_tasks
             WHERE is_active = 1 AND next_due_date < ?1
             ORDER BY next_due_date ASC, created_at ASC"
        ))?;
        let tasks = stmt
            .query_map([day_number(today)], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    #[instrument(skip(self, claim), fields(task_id = %claim.task_id))]
    fn claim_reminder(&self, claim: &ReminderClaim) -> Result<Option<ReminderRecord>> {
        let record = ReminderRecord {
            id: Uuid::now_v7().to_string(),
            task_id: claim.task_id.clone(),
            recipient_email: claim.recipient_email.clone(),
            days_overdue: claim.days_overdue,
            sent_at: claim.sent_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        let sent_on = claim.sent_at.date_naive().to_string();

        // Single statement: the UNIQUE (task_id, sent_on) constraint decides
        // the race, so concurrent triggers cannot both win the same day.
        let db = self.conn();
        let n = db.execute(
            "INSERT INTO email_reminders
             (id, task_id, recipient_email, days_overdue, sent_at, sent_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (task_id, sent_on) DO NOTHING",
            params![
                record.id,
                record.task_id.as_str(),
                record.recipient_email,
                record.days_overdue,
                record.sent_at,
                sent_on
            ],
        )?;
        if n == 0 {
            debug!(%sent_on, "reminder slot already taken");
            return Ok(None);
        }
        Ok(Some(record))
    }

    #[instrument(skip(self))]
    fn release_reminder(&self, id: &str) -> Result<()> {
        let db = self.conn();
        db.execute("DELETE FROM email_reminders WHERE id = ?1", [id])?;
        Ok(())
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    fn reminders_for_task(&self, task_id: &TaskId) -> Result<Vec<ReminderRecord>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT id, task_id, recipient_email, days_overdue, sent_at
             FROM email_reminders WHERE task_id = ?1
             ORDER BY sent_at ASC",
        )?;
        let records = stmt
            .query_map([task_id.as_str()], |row| {
                Ok(ReminderRecord {
                    id: row.get(0)?,
                    task_id: TaskId(row.get(1)?),
                    recipient_email: row.get(2)?,
                    days_overdue: row.get(3)?,
                    sent_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

/// Fixed-width timestamps so lexical order in SQL equals time order.
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Due dates are stored as day numbers so SQL comparisons follow calendar order.
fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

fn from_day_number(n: i64) -> Option<NaiveDate> {
    i32::try_from(n)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// Map a `maintenance_tasks` row (selected with [`TASK_COLUMNS`]) to a `Task`.
fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let frequency: i64 = row.get(3)?;
    let due: i64 = row.get(4)?;
    Ok(Task {
        id: TaskId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        frequency_days: u32::try_from(frequency)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, frequency))?,
        next_due_date: from_day_number(due)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(4, due))?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn at(s: &str) -> DateTime<Utc> {
        let d = day(s);
        Utc.from_utc_datetime(&d.and_hms_opt(8, 0, 0).expect("valid time"))
    }

    fn new_task(title: &str, due: &str, active: bool) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            frequency_days: 7,
            next_due_date: day(due),
            is_active: active,
        }
    }

    fn completion(by: &str, next: &str) -> Completion {
        Completion {
            completed_by: by.to_string(),
            notes: None,
            next_due_date: day(next),
        }
    }

    fn claim(task_id: &TaskId, when: &str) -> ReminderClaim {
        ReminderClaim {
            task_id: task_id.clone(),
            recipient_email: "shop@example.com".to_string(),
            days_overdue: 3,
            sent_at: at(when),
        }
    }

    fn count(store: &SqliteTaskStore, table: &str) -> i64 {
        store
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .expect("count")
    }

    #[test]
    fn list_orders_by_due_date_and_filters_active() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        store.create_task(new_task("later", "2024-03-01", true)).unwrap();
        store.create_task(new_task("paused", "2024-01-01", false)).unwrap();
        store.create_task(new_task("sooner", "2024-02-01", true)).unwrap();

        let all: Vec<_> = store
            .list_tasks(false)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(all, ["paused", "sooner", "later"]);

        let active: Vec<_> = store
            .list_tasks(true)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(active, ["sooner", "later"]);
    }

    #[test]
    fn created_task_reads_back_identically() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let mut input = new_task("Grease bearings", "2024-01-01", true);
        input.description = Some("Band saw, both wheels".into());
        let created = store.create_task(input).unwrap();
        let fetched = store.get_task(&created.id).unwrap().expect("exists");
        assert_eq!(fetched, created);
        assert!(store.get_task(&TaskId::from("missing")).unwrap().is_none());
    }

    #[test]
    fn update_applies_only_patched_fields() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.create_task(new_task("Sweep", "2024-01-01", true)).unwrap();

        let patch = TaskPatch {
            frequency_days: Some(14),
            description: Some(Some("Floor and benches".into())),
            ..Default::default()
        };
        let updated = store.update_task(&task.id, &patch).unwrap();
        assert_eq!(updated.title, "Sweep");
        assert_eq!(updated.frequency_days, 14);
        assert_eq!(updated.description.as_deref(), Some("Floor and benches"));
        assert_eq!(updated.next_due_date, day("2024-01-01"));

        let cleared = store
            .update_task(
                &task.id,
                &TaskPatch {
                    description: Some(None),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(cleared.description.is_none());
        assert!(!cleared.is_active);
    }

    #[test]
    fn update_unknown_task_is_not_found() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let patch = TaskPatch {
            title: Some("x".into()),
            ..Default::default()
        };
        let err = store.update_task(&TaskId::from("nope"), &patch).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn complete_appends_log_and_advances_due_date() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.create_task(new_task("Filters", "2024-01-01", true)).unwrap();

        let (updated, log) = store
            .complete_task(&task.id, &completion("Sam", "2024-01-17"))
            .unwrap();
        assert_eq!(updated.next_due_date, day("2024-01-17"));
        assert_eq!(log.task_id, task.id);
        assert_eq!(log.completed_by, "Sam");
        assert_eq!(count(&store, "maintenance_logs"), 1);
    }

    #[test]
    fn complete_rolls_back_log_when_schedule_update_fails() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.create_task(new_task("Filters", "2024-01-01", true)).unwrap();
        store
            .conn()
            .execute_batch(
                "CREATE TRIGGER fail_due_update BEFORE UPDATE OF next_due_date
                 ON maintenance_tasks
                 BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
            )
            .unwrap();

        let err = store
            .complete_task(&task.id, &completion("Sam", "2024-01-17"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert_eq!(count(&store, "maintenance_logs"), 0);
        let unchanged = store.get_task(&task.id).unwrap().unwrap();
        assert_eq!(unchanged.next_due_date, day("2024-01-01"));
    }

    #[test]
    fn complete_unknown_task_writes_nothing() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let err = store
            .complete_task(&TaskId::from("ghost"), &completion("Sam", "2024-01-17"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(count(&store, "maintenance_logs"), 0);
    }

    #[test]
    fn delete_cascades_logs_and_reminders() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.create_task(new_task("Compressor", "2024-01-01", true)).unwrap();
        let other = store.create_task(new_task("Other", "2024-01-01", true)).unwrap();
        for who in ["a", "b", "c"] {
            store.complete_task(&task.id, &completion(who, "2024-01-08")).unwrap();
        }
        store.complete_task(&other.id, &completion("d", "2024-01-08")).unwrap();
        assert!(store.claim_reminder(&claim(&task.id, "2024-01-09")).unwrap().is_some());
        assert!(store.claim_reminder(&claim(&task.id, "2024-01-10")).unwrap().is_some());

        let summary = store.delete_task(&task.id).unwrap();
        assert_eq!(summary.logs_removed, 3);
        assert_eq!(summary.reminders_removed, 2);
        assert_eq!(summary.total_rows(), 6);

        assert_eq!(count(&store, "maintenance_tasks"), 1);
        assert_eq!(count(&store, "maintenance_logs"), 1);
        assert_eq!(count(&store, "email_reminders"), 0);

        let err = store.delete_task(&task.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn recent_logs_join_title_newest_first() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.create_task(new_task("Dust collector", "2024-01-01", true)).unwrap();
        store.complete_task(&task.id, &completion("first", "2024-01-08")).unwrap();
        store.complete_task(&task.id, &completion("second", "2024-01-15")).unwrap();

        let logs = store.recent_logs(100).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].log.completed_by, "second");
        assert_eq!(logs[0].task_title, "Dust collector");

        assert_eq!(store.recent_logs(1).unwrap().len(), 1);
    }

    #[test]
    fn overdue_excludes_inactive_and_due_today() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        store.create_task(new_task("late", "2024-01-05", true)).unwrap();
        store.create_task(new_task("very late", "2024-01-01", true)).unwrap();
        store.create_task(new_task("today", "2024-01-10", true)).unwrap();
        store.create_task(new_task("paused", "2023-12-01", false)).unwrap();

        let titles: Vec<_> = store
            .overdue_tasks(day("2024-01-10"))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["very late", "late"]);
    }

    #[test]
    fn reminder_claim_is_once_per_task_per_day() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.create_task(new_task("Belts", "2024-01-01", true)).unwrap();

        let first = store.claim_reminder(&claim(&task.id, "2024-01-10")).unwrap();
        assert!(first.is_some());
        assert!(store.claim_reminder(&claim(&task.id, "2024-01-10")).unwrap().is_none());
        assert!(store.claim_reminder(&claim(&task.id, "2024-01-11")).unwrap().is_some());
        assert_eq!(store.reminders_for_task(&task.id).unwrap().len(), 2);
    }

    #[test]
    fn released_claim_can_be_taken_again() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.create_task(new_task("Belts", "2024-01-01", true)).unwrap();

        let record = store
            .claim_reminder(&claim(&task.id, "2024-01-10"))
            .unwrap()
            .expect("claimed");
        store.release_reminder(&record.id).unwrap();
        assert!(store.reminders_for_task(&task.id).unwrap().is_empty());
        assert!(store.claim_reminder(&claim(&task.id, "2024-01-10")).unwrap().is_some());
    }

    #[test]
    fn claim_for_unknown_task_fails_foreign_key() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let err = store
            .claim_reminder(&claim(&TaskId::from("ghost"), "2024-01-10"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn far_future_task_is_neither_overdue_nor_first() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let mut rare = new_task("rare", "2024-01-01", true);
        rare.next_due_date = NaiveDate::from_ymd_opt(12975, 8, 27).expect("representable");
        let rare = store.create_task(rare).unwrap();
        store.create_task(new_task("really overdue", "2024-01-01", true)).unwrap();
        store.create_task(new_task("end of era", "9999-12-31", true)).unwrap();

        let overdue: Vec<_> = store
            .overdue_tasks(day("2024-01-10"))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(overdue, ["really overdue"]);

        let all: Vec<_> = store
            .list_tasks(false)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(all, ["really overdue", "end of era", "rare"]);

        let fetched = store.get_task(&rare.id).unwrap().expect("exists");
        assert_eq!(fetched.next_due_date, rare.next_due_date);
    }
}
