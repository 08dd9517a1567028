//! Credentials and the auth managers the executor talks to.
//!
//! # Design
//! The executor never builds credentials. It asks an [`AuthManager`] for the
//! current one, for a fresh login when there is none, and for a refresh after
//! a 401. [`OAuthManager`] implements that against the platform's
//! `/oauth2/token` endpoint; [`StaticAuth`] serves a fixed token.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::JsonCodec;
use crate::config::{ClientConfig, OAuthConfig};
use crate::http::{HttpMethod, HttpRequest, Transport};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no client credentials configured")]
    NotConfigured,

    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("token endpoint returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("token request failed: {0}")]
    Transport(String),

    #[error("token response could not be decoded")]
    Decode,
}

/// Bearer credential issued by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn bearer(access_token: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: &str) -> Self {
        self.refresh_token = Some(refresh_token.to_string());
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Value of the `authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Source of credentials for the executor.
pub trait AuthManager: Send + Sync {
    fn current_credential(&self) -> Option<Credential>;

    /// Run the login flow when there is no credential yet.
    fn authenticate(&self) -> Result<Credential, AuthError>;

    /// Exchange the current refresh token for a new credential.
    fn refresh(&self) -> Result<Credential, AuthError>;
}

/// Serves one fixed credential and cannot refresh it.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    credential: Option<Credential>,
}

impl StaticAuth {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
        }
    }

    /// No credential at all; every query fails as unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl AuthManager for StaticAuth {
    fn current_credential(&self) -> Option<Credential> {
        self.credential.clone()
    }

    fn authenticate(&self) -> Result<Credential, AuthError> {
        self.credential.clone().ok_or(AuthError::NotConfigured)
    }

    fn refresh(&self) -> Result<Credential, AuthError> {
        Err(AuthError::NoRefreshToken)
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    36_000
}

const MAX_EXPIRES_IN: i64 = 10 * 365 * 24 * 3600;

impl TokenInfo {
    fn into_credential(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> Credential {
        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            token_type: self.token_type,
            expires_at: now + Duration::seconds(self.expires_in.clamp(0, MAX_EXPIRES_IN)),
        }
    }
}

/// OAuth2 client-credentials login with refresh-token renewal.
pub struct OAuthManager {
    token_url: String,
    oauth: Option<OAuthConfig>,
    transport: Arc<dyn Transport>,
    codec: JsonCodec,
    credential: RwLock<Option<Credential>>,
}

impl OAuthManager {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            token_url: config.token_url(),
            oauth: config.oauth.clone(),
            transport,
            codec: JsonCodec::new(),
            credential: RwLock::new(None),
        }
    }

    /// Start from a previously stored credential.
    pub fn with_credential(self, credential: Credential) -> Self {
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
        self
    }

    pub fn logout(&self) {
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn request_token(&self, form: &[(&str, &str)]) -> Result<Credential, AuthError> {
        let body = form
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.token_url.clone(),
            headers: vec![(
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            body: Some(body),
        };

        let response = self
            .transport
            .send(&request)
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if !response.is_success() {
            tracing::warn!(status = response.status, url = %self.token_url, "token request rejected");
            return Err(AuthError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        let token: TokenInfo = self.codec.decode(&response.body).ok_or(AuthError::Decode)?;
        let previous_refresh = self.current_credential().and_then(|c| c.refresh_token);
        let credential = token.into_credential(Utc::now(), previous_refresh);
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(credential)
    }
}

impl AuthManager for OAuthManager {
    fn current_credential(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn authenticate(&self) -> Result<Credential, AuthError> {
        let oauth = self.oauth.as_ref().ok_or(AuthError::NotConfigured)?;
        let secret = oauth.client_secret.as_deref().ok_or(AuthError::NotConfigured)?;
        tracing::debug!(client_id = %oauth.client_id, "requesting client-credentials token");
        self.request_token(&[
            ("grant_type", "client_credentials"),
            ("client_id", &oauth.client_id),
            ("client_secret", secret),
        ])
    }

    fn refresh(&self) -> Result<Credential, AuthError> {
        let refresh_token = self
            .current_credential()
            .and_then(|c| c.refresh_token)
            .ok_or(AuthError::NoRefreshToken)?;
        let client_id = self.oauth.as_ref().map(|o| o.client_id.as_str()).unwrap_or_default();

        let result = self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
            ("client_id", client_id),
        ]);
        if let Err(AuthError::Rejected { .. }) = &result {
            self.logout();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;

    fn config() -> ClientConfig {
        ClientConfig::new("http://localhost:3000").with_oauth("app", Some("s3cret"))
    }

    #[test]
    fn credential_expiry_and_header() {
        let now = Utc::now();
        let credential = Credential::bearer("abc", now + Duration::seconds(10));
        assert!(!credential.is_expired(now));
        assert!(credential.is_expired(now + Duration::seconds(10)));
        assert_eq!(credential.authorization(), "Bearer abc");
    }

    #[test]
    fn static_auth_cannot_refresh() {
        let auth = StaticAuth::new(Credential::bearer("abc", Utc::now()));
        assert_eq!(auth.authenticate().unwrap().access_token, "abc");
        assert!(matches!(auth.refresh(), Err(AuthError::NoRefreshToken)));
        assert!(matches!(StaticAuth::anonymous().authenticate(), Err(AuthError::NotConfigured)));
    }

    #[test]
    fn authenticate_posts_client_credentials_form() {
        let transport = FakeTransport::scripted(vec![(
            200,
            r#"{"access_token":"a1","refresh_token":"r1","token_type":"Bearer","expires_in":3600}"#,
        )]);
        let manager = OAuthManager::new(&config(), transport.clone());

        let credential = manager.authenticate().unwrap();
        assert_eq!(credential.access_token, "a1");
        assert_eq!(credential.refresh_token.as_deref(), Some("r1"));
        assert!(!credential.is_expired(Utc::now()));
        assert_eq!(manager.current_credential(), Some(credential));

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://localhost:3000/oauth2/token");
        assert_eq!(
            requests[0].header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            requests[0].body.as_deref(),
            Some("grant_type=client_credentials&client_id=app&client_secret=s3cret")
        );
    }

    #[test]
    fn refresh_keeps_previous_refresh_token_when_omitted() {
        let transport = FakeTransport::scripted(vec![(200, r#"{"access_token":"a2","expires_in":60}"#)]);
        let stored = Credential::bearer("a1", Utc::now()).with_refresh_token("r1");
        let manager = OAuthManager::new(&config(), transport.clone()).with_credential(stored);

        let fresh = manager.refresh().unwrap();
        assert_eq!(fresh.access_token, "a2");
        assert_eq!(fresh.refresh_token.as_deref(), Some("r1"));
        assert_eq!(
            transport.requests()[0].body.as_deref(),
            Some("grant_type=refresh_token&refresh_token=r1&client_id=app")
        );
    }

    #[test]
    fn rejected_refresh_clears_the_credential() {
        let transport = FakeTransport::scripted(vec![(401, r#"{"error":"invalid_grant"}"#)]);
        let stored = Credential::bearer("a1", Utc::now()).with_refresh_token("r1");
        let manager = OAuthManager::new(&config(), transport).with_credential(stored);

        let err = manager.refresh().unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 401, .. }));
        assert!(manager.current_credential().is_none());
    }

    #[test]
    fn undecodable_token_response_is_reported() {
        let transport = FakeTransport::scripted(vec![(200, "<html>")]);
        let manager = OAuthManager::new(&config(), transport);
        assert!(matches!(manager.authenticate(), Err(AuthError::Decode)));
        assert!(manager.current_credential().is_none());
    }

    #[test]
    fn missing_configuration_fails_without_a_request() {
        let transport = FakeTransport::scripted(Vec::new());
        let manager = OAuthManager::new(&ClientConfig::new("http://localhost:3000"), transport.clone());
        assert!(matches!(manager.authenticate(), Err(AuthError::NotConfigured)));
        assert!(matches!(manager.refresh(), Err(AuthError::NoRefreshToken)));
        assert!(transport.requests().is_empty());
    }
}
