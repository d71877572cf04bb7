//! Notification service implementation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr as _;
use notify_core::{
    DeviceToken, DispatchRequest, DispatchResult, FilePushEvent, Message, NewReminder, PushLog,
    SweepReport,
};
use notify_push::Dispatch;
use notify_storage::AllStorage;

use crate::{Notify, ReminderSweeper};

/// Notification service backed by a store and a dispatcher.
pub struct NotifyService<S, D> {
    store: S,
    dispatcher: Arc<D>,
    sweeper: ReminderSweeper<S, Arc<D>>,
}

impl<S: Clone, D> NotifyService<S, D> {
    /// Create a new notification service.
    pub fn new(store: S, dispatcher: D) -> Self {
        let dispatcher = Arc::new(dispatcher);
        Self {
            sweeper: ReminderSweeper::new(store.clone(), dispatcher.clone()),
            store,
            dispatcher,
        }
    }
}

impl<S, D> NotifyService<S, D>
where
    S: AllStorage,
    D: Dispatch,
{
    async fn dispatch_to_all(&self, message: Message) -> color_eyre::eyre::Result<DispatchResult> {
        let devices = self
            .store
            .find_devices()
            .wrap_err("failed to load devices")?;

        Ok(self
            .dispatcher
            .dispatch(&DispatchRequest::new(devices, message))
            .await)
    }
}

impl<S, D> Notify for NotifyService<S, D>
where
    S: AllStorage,
    D: Dispatch,
{
    async fn handle_file_push(
        &self,
        event: &FilePushEvent,
    ) -> color_eyre::eyre::Result<DispatchResult> {
        tracing::info!(filename = %event.filename(), status = %event.status(), "processing file push");

        self.store
            .insert_log(&event.log_entry(Utc::now()))
            .wrap_err("failed to record push log")?;

        self.dispatch_to_all(event.message()).await
    }

    async fn register_device(&self, token: &DeviceToken) -> color_eyre::eyre::Result<()> {
        tracing::info!(device = %token.redacted(), "registering device");

        self.store
            .upsert_device(token)
            .wrap_err("failed to register device")
    }

    async fn list_logs(&self) -> color_eyre::eyre::Result<Vec<PushLog>> {
        self.store.list_logs().wrap_err("failed to list push logs")
    }

    async fn send_test(
        &self,
        devices: Option<Vec<DeviceToken>>,
        message: Message,
    ) -> color_eyre::eyre::Result<DispatchResult> {
        match devices {
            Some(devices) => {
                tracing::info!(devices = devices.len(), "sending test notification");
                Ok(self
                    .dispatcher
                    .dispatch(&DispatchRequest::new(devices, message))
                    .await)
            }
            None => {
                tracing::info!("sending test notification to all devices");
                self.dispatch_to_all(message).await
            }
        }
    }

    async fn schedule_reminder(&self, reminder: &NewReminder) -> color_eyre::eyre::Result<String> {
        let id = self
            .store
            .insert_reminder(reminder)
            .wrap_err("failed to schedule reminder")?;

        tracing::info!(
            reminder = %id,
            device = %reminder.device.redacted(),
            scheduled_at = %reminder.scheduled_at,
            "reminder scheduled"
        );

        Ok(id)
    }

    async fn sweep_due(&self, now: DateTime<Utc>) -> color_eyre::eyre::Result<SweepReport> {
        self.sweeper.sweep_due(now).await
    }
}
