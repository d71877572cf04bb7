//! JSON API handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use notify_core::{
    DeviceToken, DispatchResult, FilePushEvent, Message, NewReminder, Payload, PushLog,
    PushStatus, SweepReport,
};
use notify_service::Notify;
use serde::{Deserialize, Serialize};

use crate::ApiError;

/// File-push event report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub filename: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl NotifyRequest {
    fn into_event(self) -> Result<FilePushEvent, ApiError> {
        let status = match self.status.as_deref() {
            None | Some("") => PushStatus::default(),
            Some(s) => s.parse::<PushStatus>()?,
        };
        Ok(FilePushEvent::new(
            self.filename,
            status,
            self.error.unwrap_or_default(),
        )?)
    }
}

/// Device registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    pub token: String,
}

/// Acknowledgement without further data.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Ad-hoc notification. Missing `devices` targets every registered device.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationRequest {
    #[serde(default)]
    pub devices: Option<Vec<String>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub payload: Option<Payload>,
}

/// Deferred single-device notification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub token: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(alias = "time")]
    pub scheduled_at: DateTime<Utc>,
}

/// Identifier of a created resource.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

fn message(title: Option<String>, body: Option<String>) -> Message {
    Message::new(title.unwrap_or_default(), body.unwrap_or_default())
}

/// Record a file-push event and notify all devices.
pub async fn notify_handler<N>(
    State(service): State<Arc<N>>,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<DispatchResult>, ApiError>
where
    N: Notify,
{
    let Json(request) = payload?;
    let event = request.into_event()?;

    let result = service.handle_file_push(&event).await?;
    Ok(Json(result))
}

/// Register a device token.
pub async fn register_token_handler<N>(
    State(service): State<Arc<N>>,
    payload: Result<Json<RegisterTokenRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError>
where
    N: Notify,
{
    let Json(request) = payload?;
    let token = DeviceToken::parse(request.token)?;

    service.register_device(&token).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Push log, newest first.
pub async fn logs_handler<N>(State(service): State<Arc<N>>) -> Result<Json<Vec<PushLog>>, ApiError>
where
    N: Notify,
{
    Ok(Json(service.list_logs().await?))
}

/// Send an ad-hoc notification.
pub async fn test_notification_handler<N>(
    State(service): State<Arc<N>>,
    payload: Result<Json<TestNotificationRequest>, JsonRejection>,
) -> Result<Json<DispatchResult>, ApiError>
where
    N: Notify,
{
    let Json(request) = payload?;

    let devices = request
        .devices
        .map(|raw| {
            raw.into_iter()
                .map(DeviceToken::parse)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    let message =
        message(request.title, request.body).with_payload(request.payload.unwrap_or_default());

    let result = service.send_test(devices, message).await?;
    Ok(Json(result))
}

/// Schedule a reminder.
pub async fn create_reminder_handler<N>(
    State(service): State<Arc<N>>,
    payload: Result<Json<ReminderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError>
where
    N: Notify,
{
    let Json(request) = payload?;
    let reminder = NewReminder {
        device: DeviceToken::parse(request.token)?,
        message: message(request.title, request.body),
        scheduled_at: request.scheduled_at,
    };

    let id = service.schedule_reminder(&reminder).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Process every reminder due now.
///
/// Answers 500 with the full report when processed reminders could not be
/// retired.
pub async fn sweep_handler<N>(
    State(service): State<Arc<N>>,
) -> Result<(StatusCode, Json<SweepReport>), ApiError>
where
    N: Notify,
{
    let report = service.sweep_due(Utc::now()).await?;
    let status = if report.is_retired() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(report)))
}

/// Liveness probe.
pub async fn health_handler() -> &'static str {
    "ok"
}
