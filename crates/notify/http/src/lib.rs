//! Notification HTTP Layer
//!
//! Axum handlers mapping the JSON API onto the notification service.

mod api;
mod error;

pub use api::*;
pub use error::*;

use std::sync::Arc;

use axum::Router;

/// Create the notification API router.
pub fn notify_router<N>(service: Arc<N>) -> Router
where
    N: notify_service::Notify + 'static,
{
    use axum::routing::{get, post};

    Router::new()
        .route("/notify", post(api::notify_handler::<N>))
        .route("/register-token", post(api::register_token_handler::<N>))
        .route("/logs", get(api::logs_handler::<N>))
        .route("/test-notification", post(api::test_notification_handler::<N>))
        .route("/reminders", post(api::create_reminder_handler::<N>))
        .route("/reminders/sweep", post(api::sweep_handler::<N>))
        .route("/health", get(api::health_handler))
        .with_state(service)
}
