//! Database models.

use diesel::prelude::*;

use crate::schema::{devices, push_logs, reminders};

/// Registered device record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = devices, primary_key(token))]
pub struct DeviceRow {
    pub token: String,
    pub created_at: chrono::NaiveDateTime,
    pub last_registered_at: chrono::NaiveDateTime,
}

/// New device for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice<'a> {
    pub token: &'a str,
    pub created_at: chrono::NaiveDateTime,
    pub last_registered_at: chrono::NaiveDateTime,
}

/// Reminder record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = reminders)]
pub struct ReminderRow {
    pub id: String,
    pub token: String,
    pub title: String,
    pub body: String,
    pub scheduled_at: chrono::NaiveDateTime,
    pub created_at: chrono::NaiveDateTime,
}

impl From<ReminderRow> for notify_core::Reminder {
    fn from(row: ReminderRow) -> Self {
        Self {
            id: row.id,
            device: row.token,
            title: row.title,
            body: row.body,
            scheduled_at: row.scheduled_at.and_utc(),
            created_at: row.created_at.and_utc(),
        }
    }
}

/// New reminder for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reminders)]
pub struct NewReminderRow<'a> {
    pub id: &'a str,
    pub token: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub scheduled_at: chrono::NaiveDateTime,
    pub created_at: chrono::NaiveDateTime,
}

/// Push log record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = push_logs)]
pub struct PushLogRow {
    pub id: i32,
    pub filename: String,
    pub status: String,
    pub error: String,
    pub timestamp: chrono::NaiveDateTime,
}

/// New push log for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = push_logs)]
pub struct NewPushLog<'a> {
    pub filename: &'a str,
    pub status: &'a str,
    pub error: &'a str,
    pub timestamp: chrono::NaiveDateTime,
}
