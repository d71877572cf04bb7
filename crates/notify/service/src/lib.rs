//! Notification Service Layer
//!
//! Inbound use cases (file-push events, registration, test sends,
//! reminders) and the due-reminder sweep.

mod notifier;
mod sweeper;
mod traits;

pub use notifier::NotifyService;
pub use sweeper::ReminderSweeper;
pub use traits::*;
