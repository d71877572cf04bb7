//! Notification Core Types
//!
//! Data model shared by the dispatch engine, the reminder sweeper and the
//! store: device tokens, dispatch requests and results, reminders, push
//! logs and the error taxonomy.

mod credential;
mod device;
mod dispatch;
mod error;
mod event;
mod reminder;

pub use credential::*;
pub use device::*;
pub use dispatch::*;
pub use error::*;
pub use event::*;
pub use reminder::*;
