//! Dispatch request and result types.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct as _;

use crate::{CredentialError, DeviceToken, ValidationError};

/// Title used when a caller supplies none.
pub const DEFAULT_TITLE: &str = "Notification";

/// Body used when a caller supplies none.
pub const DEFAULT_BODY: &str = "You have a new notification";

/// Opaque key-value data echoed to the client.
pub type Payload = BTreeMap<String, String>;

/// Notification content shared by every device of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Message {
    title: String,
    body: String,
    payload: Payload,
}

impl Message {
    /// Create a message; blank title or body fall back to the defaults.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: non_blank_or(title.into(), DEFAULT_TITLE),
            body: non_blank_or(body.into(), DEFAULT_BODY),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

fn non_blank_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// A message addressed to an ordered batch of devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    devices: Vec<DeviceToken>,
    message: Message,
}

impl DispatchRequest {
    pub fn new(devices: Vec<DeviceToken>, message: Message) -> Self {
        Self { devices, message }
    }

    pub fn devices(&self) -> &[DeviceToken] {
        &self.devices
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}

/// Result of one device's delivery attempt.
///
/// Exactly one of `receipt` and `reason` is populated.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeliveryOutcome {
    pub device: DeviceToken,
    pub success: bool,
    /// Gateway-assigned message id (if delivered).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    /// Failure description (if not delivered).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeliveryOutcome {
    /// Create a successful outcome.
    pub fn delivered(device: DeviceToken, receipt: impl Into<String>) -> Self {
        Self {
            device,
            success: true,
            receipt: Some(receipt.into()),
            reason: None,
        }
    }

    /// Create a failed outcome.
    pub fn failed(device: DeviceToken, reason: impl std::fmt::Display) -> Self {
        Self {
            device,
            success: false,
            receipt: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// Why a dispatch never reached the gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchFailure {
    #[error("no devices")]
    NoDevices,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),
}

impl DispatchFailure {
    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoDevices => "no_devices",
            Self::Credential(_) => "credential",
            Self::Invalid(_) => "invalid",
        }
    }
}

impl serde::Serialize for DispatchFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DispatchFailure", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("reason", &self.to_string())?;
        state.end()
    }
}

/// Aggregated result of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    overall_success: bool,
    outcomes: Vec<DeliveryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<DispatchFailure>,
}

impl DispatchResult {
    /// Aggregate per-device outcomes, kept in the order given.
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let overall_success = !outcomes.is_empty() && outcomes.iter().all(|o| o.success);
        Self {
            overall_success,
            outcomes,
            failure: None,
        }
    }

    /// A dispatch that could not attempt any delivery.
    pub fn failed(failure: impl Into<DispatchFailure>) -> Self {
        Self {
            overall_success: false,
            outcomes: Vec::new(),
            failure: Some(failure.into()),
        }
    }

    pub fn overall_success(&self) -> bool {
        self.overall_success
    }

    pub fn outcomes(&self) -> &[DeliveryOutcome] {
        &self.outcomes
    }

    pub fn failure(&self) -> Option<&DispatchFailure> {
        self.failure.as_ref()
    }

    /// Number of devices that received the message.
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }
}
