//! File-push events and their log entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{Message, ValidationError};

/// Title of every file-push notification.
pub const FILE_PUSH_TITLE: &str = "Push Status";

/// Outcome of a file push, as reported by the pushing client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushStatus {
    #[default]
    Success,
    Failed,
}

impl PushStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PushStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A file was pushed (or failed to push) somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePushEvent {
    filename: String,
    status: PushStatus,
    error: String,
}

impl FilePushEvent {
    pub fn new(
        filename: impl Into<String>,
        status: PushStatus,
        error: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(ValidationError::EmptyFilename);
        }

        Ok(Self {
            filename,
            status,
            error: error.into(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn status(&self) -> PushStatus {
        self.status
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    /// Notification announcing this event.
    ///
    /// The payload carries `filename` and `status`, plus `error` when one
    /// was reported.
    pub fn message(&self) -> Message {
        let body = match self.status {
            PushStatus::Success => format!("File pushed: {}", self.filename),
            PushStatus::Failed => format!("Push failed: {}", self.filename),
        };

        let message = Message::new(FILE_PUSH_TITLE, body)
            .with_data("filename", self.filename.as_str())
            .with_data("status", self.status.as_str());

        if self.error.is_empty() {
            message
        } else {
            message.with_data("error", self.error.as_str())
        }
    }

    /// Log entry recording this event at `timestamp`.
    pub fn log_entry(&self, timestamp: DateTime<Utc>) -> PushLogEntry {
        PushLogEntry {
            filename: self.filename.clone(),
            status: self.status,
            error: self.error.clone(),
            timestamp,
        }
    }
}

/// A push log entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushLogEntry {
    pub filename: String,
    pub status: PushStatus,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// A stored push log entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PushLog {
    pub id: i32,
    pub filename: String,
    pub status: PushStatus,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}
