//! Deferred single-device notifications.

use chrono::{DateTime, Utc};

use crate::{DeviceToken, DispatchRequest, DispatchResult, Message, ValidationError};

/// A persisted reminder.
///
/// `scheduled_at` is fixed at creation. The device token is kept as stored
/// and validated again when the reminder is turned into a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub device: String,
    pub title: String,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Build the one-device dispatch this reminder stands for.
    pub fn to_request(&self) -> Result<DispatchRequest, ValidationError> {
        let device = DeviceToken::parse(self.device.as_str())?;
        let message = Message::new(self.title.as_str(), self.body.as_str());
        Ok(DispatchRequest::new(vec![device], message))
    }
}

/// A reminder to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub device: DeviceToken,
    pub message: Message,
    pub scheduled_at: DateTime<Utc>,
}

/// Outcome of one sweep over due reminders.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub processed: usize,
    /// Reminders removed from the store after processing.
    pub retired: usize,
    /// Set when the processed reminders could not be removed; they will be
    /// dispatched again by the next sweep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retire_error: Option<String>,
    /// One result per processed reminder, in processing order.
    pub results: Vec<DispatchResult>,
}

impl SweepReport {
    /// Reminders whose dispatch fully succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.overall_success()).count()
    }

    /// Whether every processed reminder was removed from the store.
    pub fn is_retired(&self) -> bool {
        self.retire_error.is_none()
    }
}
