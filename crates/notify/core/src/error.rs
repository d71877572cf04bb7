//! Error taxonomy.

/// A usable gateway credential could not be obtained.
///
/// Fatal to a whole dispatch: no device is attempted when this occurs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The token exchange request never produced a response.
    #[error("token exchange failed: {0}")]
    Exchange(String),

    /// The identity provider answered with a non-success status.
    #[error("identity provider returned status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The response could not be parsed or lacked a token.
    #[error("malformed token response: {0}")]
    Malformed(String),

    /// The service account key could not sign the assertion.
    #[error("failed to sign token assertion: {0}")]
    Signing(String),
}

/// One device's delivery failed. Never escalated past its outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    /// The gateway rejected the message, over HTTP or in its protocol body.
    #[error("{message}")]
    Gateway { status: u16, message: String },

    #[error("gateway response did not include a message id")]
    MissingReceipt,
}

/// Input rejected at the boundary before reaching the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("device token is empty")]
    EmptyToken,

    #[error("device token is {0} bytes, longer than allowed")]
    TokenTooLong(usize),

    #[error("device token contains whitespace or control characters")]
    MalformedToken,

    #[error("unknown push status {0:?}")]
    UnknownStatus(String),

    #[error("filename is empty")]
    EmptyFilename,
}
