//! Due-reminder sweep.

use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr as _;
use notify_core::{DispatchResult, SweepReport};
use notify_push::Dispatch;
use notify_storage::ReminderStore;

/// Processes reminders whose scheduled time has passed.
///
/// Every reminder read by a sweep is retired afterwards, whatever the
/// outcome of its dispatch. A failed removal is reported in
/// [`SweepReport::retire_error`] alongside the dispatch results.
#[derive(Clone)]
pub struct ReminderSweeper<S, D> {
    store: S,
    dispatcher: D,
}

impl<S, D> ReminderSweeper<S, D> {
    /// Create a new sweeper.
    pub fn new(store: S, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }
}

impl<S: ReminderStore, D: Dispatch> ReminderSweeper<S, D> {
    /// Dispatch and retire every reminder due at `now`.
    ///
    /// Fails only when the due reminders cannot be read.
    pub async fn sweep_due(&self, now: DateTime<Utc>) -> color_eyre::eyre::Result<SweepReport> {
        let due = self
            .store
            .find_due_reminders(now)
            .wrap_err("failed to load due reminders")?;

        if due.is_empty() {
            tracing::debug!("no reminders due");
            return Ok(SweepReport::default());
        }

        let mut results = Vec::with_capacity(due.len());
        for reminder in &due {
            let result = match reminder.to_request() {
                Ok(request) => self.dispatcher.dispatch(&request).await,
                Err(e) => {
                    tracing::warn!(reminder = %reminder.id, error = %e, "reminder not dispatchable");
                    DispatchResult::failed(e)
                }
            };
            results.push(result);
        }

        let ids: Vec<&str> = due.iter().map(|r| r.id.as_str()).collect();
        let (retired, retire_error) = match self.store.delete_reminders(&ids) {
            Ok(n) => (n, None),
            Err(e) => {
                tracing::error!(error = ?e, count = ids.len(), "failed to retire reminders");
                (0, Some(format!("{e:#}")))
            }
        };

        let report = SweepReport {
            processed: due.len(),
            retired,
            retire_error,
            results,
        };
        tracing::info!(
            processed = report.processed,
            succeeded = report.succeeded(),
            retired = report.retired,
            "sweep complete"
        );

        Ok(report)
    }
}
