//! Notification Push Delivery
//!
//! Gateway credentials, per-device delivery over FCM, and the dispatcher
//! that fans a message out across a batch of devices.

mod credentials;
mod dispatch;
mod fcm;
mod traits;

pub use credentials::*;
pub use dispatch::*;
pub use fcm::*;
pub use traits::*;
