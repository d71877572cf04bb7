//! Gateway bearer credential.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Bearer token plus the instant it stops being valid.
///
/// Held in memory only; never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential remains valid for longer than `margin` after `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin > now
    }

    /// Authorization header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
