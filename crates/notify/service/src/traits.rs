//! Service traits.

use chrono::{DateTime, Utc};
use notify_core::{
    DeviceToken, DispatchResult, FilePushEvent, Message, NewReminder, PushLog, SweepReport,
};

/// Operations exposed to the request layer.
///
/// Inputs are already validated; errors are store failures.
#[trait_variant::make(Send)]
pub trait Notify: Send + Sync {
    /// Log a file-push event and notify every registered device.
    async fn handle_file_push(&self, event: &FilePushEvent)
    -> color_eyre::eyre::Result<DispatchResult>;

    /// Register a device token.
    async fn register_device(&self, token: &DeviceToken) -> color_eyre::eyre::Result<()>;

    /// Push log, newest first.
    async fn list_logs(&self) -> color_eyre::eyre::Result<Vec<PushLog>>;

    /// Send an ad-hoc message; `None` targets every registered device.
    async fn send_test(
        &self,
        devices: Option<Vec<DeviceToken>>,
        message: Message,
    ) -> color_eyre::eyre::Result<DispatchResult>;

    /// Persist a reminder and return its id.
    async fn schedule_reminder(&self, reminder: &NewReminder) -> color_eyre::eyre::Result<String>;

    /// Process every reminder due at `now`.
    async fn sweep_due(&self, now: DateTime<Utc>) -> color_eyre::eyre::Result<SweepReport>;
}
