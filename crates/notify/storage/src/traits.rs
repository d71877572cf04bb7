//! Storage traits.

use chrono::{DateTime, Utc};
use notify_core::{DeviceToken, NewReminder, PushLog, PushLogEntry, Reminder};

/// Registered device storage.
pub trait DeviceStore: Send + Sync {
    /// Register a device. Registering a known token only refreshes it.
    fn upsert_device(&self, token: &DeviceToken) -> color_eyre::eyre::Result<()>;

    /// All registered devices, oldest registration first.
    fn find_devices(&self) -> color_eyre::eyre::Result<Vec<DeviceToken>>;
}

/// Reminder storage.
pub trait ReminderStore: Send + Sync {
    /// Insert a reminder and return its id.
    fn insert_reminder(&self, reminder: &NewReminder) -> color_eyre::eyre::Result<String>;

    /// Reminders scheduled at or before `now`.
    fn find_due_reminders(&self, now: DateTime<Utc>) -> color_eyre::eyre::Result<Vec<Reminder>>;

    /// Delete exactly the given reminders, returning how many were removed.
    fn delete_reminders(&self, ids: &[&str]) -> color_eyre::eyre::Result<usize>;
}

/// Append-only push log.
pub trait PushLogStore: Send + Sync {
    /// Append a log entry.
    fn insert_log(&self, entry: &PushLogEntry) -> color_eyre::eyre::Result<()>;

    /// All entries, newest first.
    fn list_logs(&self) -> color_eyre::eyre::Result<Vec<PushLog>>;
}

/// Combined storage trait.
pub trait AllStorage: DeviceStore + ReminderStore + PushLogStore {}

impl<T> AllStorage for T where T: DeviceStore + ReminderStore + PushLogStore {}
