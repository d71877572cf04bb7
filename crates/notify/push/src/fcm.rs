//! FCM HTTP v1 gateway client.

use notify_core::{Credential, DeliveryError, DeliveryOutcome, DeviceToken, Message, Payload};
use serde::{Deserialize, Serialize};

use crate::Gateway;

/// FCM HTTP v1 send endpoint; `{project_id}` is substituted.
const FCM_API_URL_TEMPLATE: &str =
    "https://fcm.googleapis.com/v1/projects/{project_id}/messages:send";

#[derive(Debug, Serialize)]
pub struct FcmMessage<'a> {
    pub message: FcmMessageBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct FcmMessageBody<'a> {
    pub token: &'a str,
    pub notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a Payload>,
}

#[derive(Debug, Serialize)]
pub struct FcmNotification<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct FcmResponse {
    name: Option<String>,
    error: Option<FcmError>,
}

#[derive(Debug, Deserialize)]
struct FcmError {
    code: Option<u16>,
    message: Option<String>,
}

/// Gateway client for Firebase Cloud Messaging.
#[derive(Debug, Clone)]
pub struct FcmGateway {
    http: reqwest::Client,
    api_url: String,
}

impl FcmGateway {
    /// Create a gateway sending to the given project.
    ///
    /// Per-request timeouts come from the supplied client.
    pub fn new(http: reqwest::Client, project_id: &str) -> Self {
        Self::with_url(http, FCM_API_URL_TEMPLATE.replace("{project_id}", project_id))
    }

    /// Create a gateway sending to an explicit endpoint, e.g. an emulator.
    pub fn with_url(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Build the request body addressed to one device.
    pub fn build_message<'a>(device: &'a DeviceToken, message: &'a Message) -> FcmMessage<'a> {
        let payload = message.payload();

        FcmMessage {
            message: FcmMessageBody {
                token: device.as_str(),
                notification: FcmNotification {
                    title: message.title(),
                    body: message.body(),
                },
                data: (!payload.is_empty()).then_some(payload),
            },
        }
    }

    async fn send(
        &self,
        credential: &Credential,
        device: &DeviceToken,
        message: &Message,
    ) -> Result<String, DeliveryError> {
        let response = self
            .http
            .post(&self.api_url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .json(&Self::build_message(device, message))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        classify_response(status, &body)
    }
}

impl Gateway for FcmGateway {
    async fn deliver(
        &self,
        credential: &Credential,
        device: &DeviceToken,
        message: &Message,
    ) -> DeliveryOutcome {
        match self.send(credential, device, message).await {
            Ok(receipt) => {
                tracing::debug!(device = %device.redacted(), receipt = %receipt, "delivered");
                DeliveryOutcome::delivered(device.clone(), receipt)
            }
            Err(e) => {
                tracing::warn!(device = %device.redacted(), error = %e, "delivery failed");
                DeliveryOutcome::failed(device.clone(), e)
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> DeliveryError {
    if e.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Transport(e.to_string())
    }
}

/// Map a gateway response onto a receipt or a delivery error.
///
/// An `error` object fails the delivery even under a 2xx status.
fn classify_response(status: u16, body: &str) -> Result<String, DeliveryError> {
    let parsed: FcmResponse = serde_json::from_str(body).unwrap_or_default();

    if !(200..300).contains(&status) || parsed.error.is_some() {
        let error = parsed.error;
        let code = error.as_ref().and_then(|e| e.code).unwrap_or(status);
        let message = error
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("gateway returned status {status}"));

        return Err(DeliveryError::Gateway {
            status: code,
            message,
        });
    }

    parsed
        .name
        .filter(|n| !n.is_empty())
        .ok_or(DeliveryError::MissingReceipt)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SEND_PATH: &str = "/v1/projects/test-project/messages:send";

    fn token(s: &str) -> DeviceToken {
        DeviceToken::parse(s).unwrap()
    }

    fn credential() -> Credential {
        Credential::new("access-123", Utc::now() + chrono::Duration::hours(1))
    }

    fn gateway(server: &MockServer) -> FcmGateway {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        FcmGateway::with_url(http, format!("{}{SEND_PATH}", server.uri()))
    }

    #[test]
    fn test_default_url() {
        let gw = FcmGateway::new(reqwest::Client::new(), "test-project-123");
        assert_eq!(
            gw.api_url(),
            "https://fcm.googleapis.com/v1/projects/test-project-123/messages:send"
        );
    }

    #[test]
    fn test_message_json_shape() {
        let device = token("tok");
        let without_data = Message::new("T", "B");
        let json = serde_json::to_value(FcmGateway::build_message(&device, &without_data)).unwrap();

        assert_eq!(json["message"]["token"], "tok");
        assert_eq!(json["message"]["notification"]["title"], "T");
        assert_eq!(json["message"]["notification"]["body"], "B");
        assert!(json["message"].get("data").is_none());

        let with_data = Message::new("T", "B").with_data("filename", "a.csv");
        let json = serde_json::to_value(FcmGateway::build_message(&device, &with_data)).unwrap();
        assert_eq!(json["message"]["data"]["filename"], "a.csv");
    }

    #[test]
    fn test_classify_protocol_error_in_success_body() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        assert_eq!(
            classify_response(200, body),
            Err(DeliveryError::Gateway {
                status: 404,
                message: "Requested entity was not found.".to_string()
            })
        );
    }

    #[test]
    fn test_classify_missing_receipt() {
        assert_eq!(classify_response(200, "{}"), Err(DeliveryError::MissingReceipt));
        assert_eq!(
            classify_response(200, "not json"),
            Err(DeliveryError::MissingReceipt)
        );
    }

    #[tokio::test]
    async fn test_deliver_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(header("authorization", "Bearer access-123"))
            .and(body_partial_json(serde_json::json!({
                "message": {
                    "token": "tok-A",
                    "notification": { "title": "Push Status", "body": "File pushed: report.csv" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/test-project/messages/0:1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let message = Message::new("Push Status", "File pushed: report.csv");
        let outcome = gateway(&server)
            .deliver(&credential(), &token("tok-A"), &message)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.device.as_str(), "tok-A");
        assert_eq!(
            outcome.receipt.as_deref(),
            Some("projects/test-project/messages/0:1")
        );
        assert!(outcome.reason.is_none());
    }

    #[tokio::test]
    async fn test_deliver_gateway_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": 400,
                    "message": "The registration token is not a valid FCM registration token",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let outcome = gateway(&server)
            .deliver(&credential(), &token("bad"), &Message::new("t", "b"))
            .await;

        assert!(!outcome.success);
        assert!(outcome.receipt.is_none());
        assert_eq!(
            outcome.reason.as_deref(),
            Some("The registration token is not a valid FCM registration token")
        );
    }

    #[tokio::test]
    async fn test_deliver_generic_reason_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = gateway(&server)
            .deliver(&credential(), &token("tok"), &Message::new("t", "b"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.reason.as_deref(), Some("gateway returned status 503"));
    }

    #[tokio::test]
    async fn test_deliver_timeout_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "name": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let outcome = gateway(&server)
            .deliver(&credential(), &token("tok"), &Message::new("t", "b"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.reason.as_deref(), Some("request timed out"));
    }

    #[tokio::test]
    async fn test_deliver_connection_refused() {
        let gw = FcmGateway::with_url(reqwest::Client::new(), format!("http://127.0.0.1:1{SEND_PATH}"));

        let outcome = gw
            .deliver(&credential(), &token("tok"), &Message::new("t", "b"))
            .await;

        assert!(!outcome.success);
        assert!(outcome.reason.unwrap().starts_with("transport error"));
    }
}
