//! Gateway credentials: OAuth token exchange and the single-flight cache.

use std::path::Path;

use chrono::{Duration, Utc};
use color_eyre::eyre::WrapErr as _;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use notify_core::{Credential, CredentialError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{CredentialProvider, TokenExchange};

/// OAuth scope granting FCM send access.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh when a credential is this close to expiry.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for a signed assertion.
const ASSERTION_TTL_SECS: i64 = 3600;

/// Service account key, as downloaded from the Google Cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    /// RSA private key in PEM format.
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Load a key from a JSON key file.
    pub fn from_file(path: &Path) -> color_eyre::eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read service account key {}", path.display()))?;

        serde_json::from_str(&content).wrap_err("failed to parse service account key")
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// OAuth 2.0 JWT-bearer exchange against a token endpoint.
pub struct OAuthTokenExchange {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    scope: String,
    signing_key: EncodingKey,
}

impl OAuthTokenExchange {
    /// Create an exchange for a service account key.
    pub fn new(
        http: reqwest::Client,
        key: &ServiceAccountKey,
        scope: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CredentialError::Signing(e.to_string()))?;

        Ok(Self {
            http,
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            scope: scope.into(),
            signing_key,
        })
    }

    fn assertion(&self) -> Result<String, CredentialError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: &self.scope,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    async fn request_token(&self, assertion: &str) -> Result<Credential, CredentialError> {
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await
            .map_err(|e| CredentialError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;

        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CredentialError::Malformed("missing access_token".to_string()))?;
        let lifetime = body.expires_in.unwrap_or(ASSERTION_TTL_SECS);
        let expires_at = Some(lifetime)
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or_else(|| CredentialError::Malformed(format!("invalid expires_in {lifetime}")))?;

        Ok(Credential::new(token, expires_at))
    }
}

impl TokenExchange for OAuthTokenExchange {
    async fn exchange(&self) -> Result<Credential, CredentialError> {
        let assertion = self.assertion()?;
        self.request_token(&assertion).await
    }
}

/// Process-lifetime credential cache.
///
/// Refresh is single-flight: the cache lock is held across the exchange,
/// so concurrent callers wait for the refresh in progress and then read
/// its result. A failed exchange caches nothing.
pub struct CredentialStore<E> {
    exchange: E,
    margin: Duration,
    cached: Mutex<Option<Credential>>,
}

impl<E> CredentialStore<E> {
    /// Create an empty store with the default refresh margin.
    pub fn new(exchange: E) -> Self {
        Self {
            exchange,
            margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            cached: Mutex::new(None),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }
}

impl<E: TokenExchange> CredentialProvider for CredentialStore<E> {
    async fn acquire(&self) -> Result<Credential, CredentialError> {
        let mut cached = self.cached.lock().await;

        if let Some(credential) = cached
            .as_ref()
            .filter(|c| c.is_usable_at(Utc::now(), self.margin))
        {
            return Ok(credential.clone());
        }

        tracing::debug!("refreshing gateway credential");

        match self.exchange.exchange().await {
            Ok(credential) => {
                tracing::info!(expires_at = %credential.expires_at(), "gateway credential refreshed");
                *cached = Some(credential.clone());
                Ok(credential)
            }
            Err(e) => {
                tracing::error!(error = %e, "gateway credential refresh failed");
                *cached = None;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Exchange that counts calls and hands out credentials of a fixed lifetime.
    struct CountingExchange {
        calls: AtomicUsize,
        lifetime: Duration,
        fail: bool,
    }

    impl CountingExchange {
        fn new(lifetime: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Duration::hours(1))
            }
        }
    }

    impl TokenExchange for CountingExchange {
        async fn exchange(&self) -> Result<Credential, CredentialError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;

            if self.fail {
                return Err(CredentialError::Exchange("connection refused".to_string()));
            }
            Ok(Credential::new(format!("token-{n}"), Utc::now() + self.lifetime))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_exchanges_once() {
        let store = Arc::new(CredentialStore::new(CountingExchange::new(Duration::hours(1))));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.acquire().await })
            })
            .collect();

        for handle in handles {
            let credential = handle.await.unwrap().unwrap();
            assert_eq!(credential.token(), "token-1");
        }

        assert_eq!(store.exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_credential_reused() {
        let store = CredentialStore::new(CountingExchange::new(Duration::hours(1)));

        store.acquire().await.unwrap();
        store.acquire().await.unwrap();

        assert_eq!(store.exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_inside_margin() {
        let store = CredentialStore::new(CountingExchange::new(Duration::seconds(30)));

        let first = store.acquire().await.unwrap();
        let second = store.acquire().await.unwrap();

        assert_eq!(first.token(), "token-1");
        assert_eq!(second.token(), "token-2");
        assert_eq!(store.exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let store = CredentialStore::new(CountingExchange::failing());

        assert!(matches!(
            store.acquire().await,
            Err(CredentialError::Exchange(_))
        ));
        assert!(store.acquire().await.is_err());
        assert_eq!(store.exchange.calls.load(Ordering::SeqCst), 2);
        assert!(store.cached.lock().await.is_none());
    }

    fn exchange_against(server: &MockServer) -> OAuthTokenExchange {
        OAuthTokenExchange {
            http: reqwest::Client::new(),
            client_email: "svc@test-project.iam.gserviceaccount.com".to_string(),
            token_uri: format!("{}/token", server.uri()),
            scope: FCM_SCOPE.to_string(),
            signing_key: EncodingKey::from_secret(b"not-an-rsa-key"),
        }
    }

    #[tokio::test]
    async fn test_request_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant-type%3Ajwt-bearer"))
            .and(body_string_contains("assertion=signed.jwt.value"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let before = Utc::now();
        let credential = exchange_against(&server)
            .request_token("signed.jwt.value")
            .await
            .unwrap();

        assert_eq!(credential.token(), "ya29.token");
        assert!(credential.expires_at() >= before + Duration::seconds(3599));
        assert!(credential.expires_at() <= Utc::now() + Duration::seconds(3599));
    }

    #[tokio::test]
    async fn test_request_token_missing_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "token_type": "Bearer" })),
            )
            .mount(&server)
            .await;

        let err = exchange_against(&server)
            .request_token("a")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CredentialError::Malformed("missing access_token".to_string())
        );
    }

    #[tokio::test]
    async fn test_request_token_out_of_range_expiry() {
        for expires_in in [i64::MAX, 0, -30] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "ya29.token",
                    "expires_in": expires_in
                })))
                .mount(&server)
                .await;

            let err = exchange_against(&server)
                .request_token("a")
                .await
                .unwrap_err();
            assert_eq!(
                err,
                CredentialError::Malformed(format!("invalid expires_in {expires_in}"))
            );
        }
    }

    #[tokio::test]
    async fn test_request_token_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;

        let err = exchange_against(&server)
            .request_token("a")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Rejected { status: 400, ref body } if body.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn test_exchange_with_unusable_key_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = exchange_against(&server).exchange().await.unwrap_err();
        assert!(matches!(err, CredentialError::Signing(_)));
    }

    #[test]
    fn test_new_rejects_bad_pem() {
        let key = ServiceAccountKey {
            project_id: "p".to_string(),
            client_email: "svc@p.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
        };

        let result = OAuthTokenExchange::new(reqwest::Client::new(), &key, FCM_SCOPE);
        assert!(matches!(result, Err(CredentialError::Signing(_))));
    }

    #[test]
    fn test_key_file_defaults_token_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(
            &path,
            r#"{"project_id":"p","client_email":"svc@p","private_key":"pem"}"#,
        )
        .unwrap();

        let key = ServiceAccountKey::from_file(&path).unwrap();
        assert_eq!(key.project_id, "p");
        assert_eq!(key.token_uri, GOOGLE_TOKEN_URI);
        assert!(!format!("{key:?}").contains("private_key"));

        assert!(ServiceAccountKey::from_file(&dir.path().join("missing.json")).is_err());
    }
}
