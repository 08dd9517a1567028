//! Turns built requests into decoded results.
//!
//! # Design
//! One execution runs strictly in order: pick a credential (logging in when
//! there is none), send, and on a 401 refresh once and resend once. A second
//! 401 is final. Only then is the body decoded.
//!
//! Logins and refreshes are single-flight. Concurrent executions that all see a 401
//! queue on `refresh_gate`; whoever gets in first refreshes, and the rest find
//! a credential that differs from the one that was rejected and reuse it.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{AuthManager, Credential};
use crate::codec::JsonCodec;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse, Transport};

const UNAUTHORIZED: u16 = 401;

pub struct Executor {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthManager>,
    codec: JsonCodec,
    refresh_gate: Mutex<()>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, auth: Arc<dyn AuthManager>) -> Self {
        Self {
            config,
            transport,
            auth,
            codec: JsonCodec::new(),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Send `request` with credentials attached and decode the body as `T`.
    pub fn execute<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ClientError> {
        let (credential, refreshed) = self.credential()?;
        let mut response = self.send(&request, &credential)?;

        if response.status == UNAUTHORIZED {
            if refreshed {
                return Err(self.rejected(&request));
            }
            let fresh = self.refresh_after(&credential)?;
            response = self.send(&request, &fresh)?;
            if response.status == UNAUTHORIZED {
                return Err(self.rejected(&request));
            }
        }

        if !response.is_success() {
            warn!(
                method = %request.method,
                url = %request.url,
                status = response.status,
                "query failed"
            );
            return Err(ClientError::Api {
                status: response.status,
                body: response.body,
            });
        }

        self.decode(&response.body)
    }

    /// The credential to send with, and whether obtaining it already used up
    /// the refresh.
    fn credential(&self) -> Result<(Credential, bool), ClientError> {
        match self.auth.current_credential() {
            Some(credential) if !credential.is_expired(Utc::now()) => Ok((credential, false)),
            Some(expired) => {
                debug!("credential expired before sending");
                Ok((self.refresh_after(&expired)?, true))
            }
            None => Ok((self.login()?, false)),
        }
    }

    /// Log in behind the same gate as refreshes, so concurrent first queries
    /// share one login.
    fn login(&self) -> Result<Credential, ClientError> {
        let _gate = self.refresh_gate.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = self.auth.current_credential() {
            if !current.is_expired(Utc::now()) {
                debug!("logged in by another query");
                return Ok(current);
            }
        }

        debug!("no credential, authenticating");
        self.auth
            .authenticate()
            .map_err(|e| ClientError::Unauthenticated(e.to_string()))
    }

    fn refresh_after(&self, rejected: &Credential) -> Result<Credential, ClientError> {
        let _gate = self.refresh_gate.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = self.auth.current_credential() {
            if current.access_token != rejected.access_token && !current.is_expired(Utc::now()) {
                debug!("credential already refreshed by another query");
                return Ok(current);
            }
        }

        debug!("refreshing credential");
        self.auth
            .refresh()
            .map_err(|e| ClientError::AuthExpired(e.to_string()))
    }

    fn send(&self, request: &HttpRequest, credential: &Credential) -> Result<HttpResponse, ClientError> {
        let mut request = request.clone();
        request
            .headers
            .push(("authorization".to_string(), credential.authorization()));
        debug!(method = %request.method, url = %request.url, "sending query");
        self.transport.send(&request)
    }

    fn rejected(&self, request: &HttpRequest) -> ClientError {
        warn!(method = %request.method, url = %request.url, "credential rejected after refresh");
        ClientError::AuthExpired("credential rejected after refresh".to_string())
    }

    fn decode<T: DeserializeOwned>(&self, body: &str) -> Result<T, ClientError> {
        // Empty bodies (204) decode as `null`.
        let json = if body.trim().is_empty() { "null" } else { body };
        self.codec.decode(json).ok_or_else(|| ClientError::Decode {
            type_name: type_name::<T>(),
            body: body.to_string(),
        })
    }
}
