//! SQLite storage implementation.

use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;

use crate::models::*;
use crate::schema::*;
use crate::traits::*;
use notify_core::{DeviceToken, NewReminder, PushLog, PushLogEntry, Reminder};

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// SQLite-based storage.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database URL.
    pub fn new(database_url: &str) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        conn.run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }
}

impl DeviceStore for SqliteStorage {
    fn upsert_device(&self, token: &DeviceToken) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();

        let new_device = NewDevice {
            token: token.as_str(),
            created_at: now,
            last_registered_at: now,
        };

        diesel::insert_into(devices::table)
            .values(&new_device)
            .on_conflict(devices::token)
            .do_update()
            .set(devices::last_registered_at.eq(now))
            .execute(&mut conn)
            .wrap_err("failed to upsert device")?;

        Ok(())
    }

    fn find_devices(&self) -> color_eyre::eyre::Result<Vec<DeviceToken>> {
        let mut conn = self.conn()?;

        let tokens: Vec<String> = devices::table
            .order((devices::created_at.asc(), devices::token.asc()))
            .select(devices::token)
            .load(&mut conn)
            .wrap_err("failed to load devices")?;

        Ok(tokens
            .into_iter()
            .filter_map(|raw| match DeviceToken::parse(raw) {
                Ok(token) => Some(token),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparsable stored device token");
                    None
                }
            })
            .collect())
    }
}

impl ReminderStore for SqliteStorage {
    fn insert_reminder(&self, reminder: &NewReminder) -> color_eyre::eyre::Result<String> {
        let mut conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();

        let row = NewReminderRow {
            id: &id,
            token: reminder.device.as_str(),
            title: reminder.message.title(),
            body: reminder.message.body(),
            scheduled_at: reminder.scheduled_at.naive_utc(),
            created_at: Utc::now().naive_utc(),
        };

        diesel::insert_into(reminders::table)
            .values(&row)
            .execute(&mut conn)
            .wrap_err("failed to insert reminder")?;

        Ok(id)
    }

    fn find_due_reminders(&self, now: DateTime<Utc>) -> color_eyre::eyre::Result<Vec<Reminder>> {
        let mut conn = self.conn()?;

        let rows: Vec<ReminderRow> = reminders::table
            .filter(reminders::scheduled_at.le(now.naive_utc()))
            .order((reminders::scheduled_at.asc(), reminders::created_at.asc()))
            .select(ReminderRow::as_select())
            .load(&mut conn)
            .wrap_err("failed to query due reminders")?;

        Ok(rows.into_iter().map(Reminder::from).collect())
    }

    fn delete_reminders(&self, ids: &[&str]) -> color_eyre::eyre::Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;

        let deleted = diesel::delete(reminders::table.filter(reminders::id.eq_any(ids)))
            .execute(&mut conn)
            .wrap_err("failed to delete reminders")?;

        Ok(deleted)
    }
}

impl PushLogStore for SqliteStorage {
    fn insert_log(&self, entry: &PushLogEntry) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;

        let row = NewPushLog {
            filename: &entry.filename,
            status: entry.status.as_str(),
            error: &entry.error,
            timestamp: entry.timestamp.naive_utc(),
        };

        diesel::insert_into(push_logs::table)
            .values(&row)
            .execute(&mut conn)
            .wrap_err("failed to insert push log")?;

        Ok(())
    }

    fn list_logs(&self) -> color_eyre::eyre::Result<Vec<PushLog>> {
        let mut conn = self.conn()?;

        let rows: Vec<PushLogRow> = push_logs::table
            .order((push_logs::timestamp.desc(), push_logs::id.desc()))
            .select(PushLogRow::as_select())
            .load(&mut conn)
            .wrap_err("failed to load push logs")?;

        rows.into_iter()
            .map(|row| -> color_eyre::eyre::Result<PushLog> {
                let status = row
                    .status
                    .parse()
                    .wrap_err_with(|| format!("bad status in push log {}", row.id))?;

                Ok(PushLog {
                    id: row.id,
                    filename: row.filename,
                    status,
                    error: row.error,
                    timestamp: row.timestamp.and_utc(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use notify_core::{Message, PushStatus};

    fn storage() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify.db");
        let storage = SqliteStorage::new(path.to_str().unwrap()).unwrap();
        storage.run_migrations().unwrap();
        (dir, storage)
    }

    fn token(s: &str) -> DeviceToken {
        DeviceToken::parse(s).unwrap()
    }

    fn reminder_at(device: &str, at: DateTime<Utc>) -> NewReminder {
        NewReminder {
            device: token(device),
            message: Message::new("Reminder", "check the upload"),
            scheduled_at: at,
        }
    }

    #[test]
    fn test_upsert_device_is_idempotent() {
        let (_dir, storage) = storage();

        storage.upsert_device(&token("tok-A")).unwrap();
        storage.upsert_device(&token("tok-A")).unwrap();
        storage.upsert_device(&token("tok-B")).unwrap();

        let devices = storage.find_devices().unwrap();
        assert_eq!(devices, vec![token("tok-A"), token("tok-B")]);
    }

    #[test]
    fn test_due_reminders_inclusive_boundary() {
        let (_dir, storage) = storage();
        let now = Utc::now();

        let past = storage
            .insert_reminder(&reminder_at("tok-A", now - Duration::minutes(5)))
            .unwrap();
        let exact = storage.insert_reminder(&reminder_at("tok-B", now)).unwrap();
        let future = storage
            .insert_reminder(&reminder_at("tok-C", now + Duration::minutes(5)))
            .unwrap();

        let due = storage.find_due_reminders(now).unwrap();
        let ids: Vec<&str> = due.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![past.as_str(), exact.as_str()]);
        assert_eq!(due[0].device, "tok-A");
        assert_eq!(due[0].title, "Reminder");

        assert_eq!(storage.delete_reminders(&ids).unwrap(), 2);
        assert!(storage.find_due_reminders(now).unwrap().is_empty());

        let later = storage
            .find_due_reminders(now + Duration::minutes(10))
            .unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].id, future);
    }

    #[test]
    fn test_delete_nothing() {
        let (_dir, storage) = storage();
        assert_eq!(storage.delete_reminders(&[]).unwrap(), 0);
    }

    #[test]
    fn test_logs_newest_first() {
        let (_dir, storage) = storage();
        let now = Utc::now();

        storage
            .insert_log(&PushLogEntry {
                filename: "old.csv".to_string(),
                status: PushStatus::Success,
                error: String::new(),
                timestamp: now - Duration::hours(1),
            })
            .unwrap();
        storage
            .insert_log(&PushLogEntry {
                filename: "new.csv".to_string(),
                status: PushStatus::Failed,
                error: "timeout".to_string(),
                timestamp: now,
            })
            .unwrap();

        let logs = storage.list_logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].filename, "new.csv");
        assert_eq!(logs[0].status, PushStatus::Failed);
        assert_eq!(logs[0].error, "timeout");
        assert_eq!(logs[1].filename, "old.csv");
    }
}
