//! Push delivery traits.

use notify_core::{
    Credential, CredentialError, DeliveryOutcome, DeviceToken, DispatchRequest, DispatchResult,
    Message,
};

/// Exchanges long-lived service credentials for a bearer credential.
#[trait_variant::make(Send)]
pub trait TokenExchange: Send + Sync {
    /// Perform one authorization exchange with the identity provider.
    async fn exchange(&self) -> Result<Credential, CredentialError>;
}

/// Hands out a credential usable against the push gateway.
#[trait_variant::make(Send)]
pub trait CredentialProvider: Send + Sync {
    /// Return a usable credential, refreshing it if needed.
    async fn acquire(&self) -> Result<Credential, CredentialError>;
}

/// One-shot delivery of a notification to a single device.
#[trait_variant::make(Send)]
pub trait Gateway: Send + Sync {
    /// Send `message` to `device`. Never retries.
    async fn deliver(
        &self,
        credential: &Credential,
        device: &DeviceToken,
        message: &Message,
    ) -> DeliveryOutcome;
}

/// Fan-out of one message across a batch of devices.
#[trait_variant::make(Send)]
pub trait Dispatch: Send + Sync {
    /// Deliver to every device of the request and aggregate the outcomes.
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult;
}

impl<T: Dispatch> Dispatch for std::sync::Arc<T> {
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult {
        (**self).dispatch(request).await
    }
}
