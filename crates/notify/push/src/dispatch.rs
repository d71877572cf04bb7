//! Fan-out of one message across a batch of devices.

use futures::StreamExt as _;
use notify_core::{DeliveryOutcome, DispatchFailure, DispatchRequest, DispatchResult};

use crate::{CredentialProvider, Dispatch, Gateway};

/// Default bound on concurrent gateway requests per dispatch.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Dispatcher that authenticates once per dispatch and delivers to every
/// device.
///
/// Deliveries run concurrently up to `max_in_flight`; outcomes are always
/// returned in the order of the request's devices.
pub struct Dispatcher<C, G> {
    credentials: C,
    gateway: G,
    max_in_flight: usize,
}

impl<C, G> Dispatcher<C, G> {
    /// Create a new dispatcher.
    pub fn new(credentials: C, gateway: G) -> Self {
        Self {
            credentials,
            gateway,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Bound concurrent deliveries. `1` delivers sequentially.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

impl<C, G> Dispatch for Dispatcher<C, G>
where
    C: CredentialProvider,
    G: Gateway,
{
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult {
        let devices = request.devices();
        if devices.is_empty() {
            tracing::info!("dispatch skipped: no devices");
            return DispatchResult::failed(DispatchFailure::NoDevices);
        }

        let credential = match self.credentials.acquire().await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::error!(error = %e, devices = devices.len(), "dispatch aborted");
                return DispatchResult::failed(e);
            }
        };

        let message = request.message();
        let pending: Vec<_> = devices
            .iter()
            .map(|device| self.gateway.deliver(&credential, device, message))
            .collect();
        let outcomes: Vec<DeliveryOutcome> = futures::stream::iter(pending)
            .buffered(self.max_in_flight)
            .collect()
            .await;

        let result = DispatchResult::from_outcomes(outcomes);
        tracing::info!(
            devices = devices.len(),
            delivered = result.delivered_count(),
            success = result.overall_success(),
            "dispatch complete"
        );

        result
    }
}
