//! In-memory transport and auth doubles shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Duration as TimeDelta, Utc};

use crate::auth::{AuthError, AuthManager, Credential};
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse, Transport};

pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, ClientError> + Send + Sync>;

/// Answers through a closure and keeps every request it saw.
pub(crate) struct FakeTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Replays `responses` in order, then fails with a transport error.
    pub(crate) fn scripted(responses: Vec<(u16, &str)>) -> Arc<Self> {
        let queue: Vec<HttpResponse> = responses
            .into_iter()
            .rev()
            .map(|(status, body)| response(status, body))
            .collect();
        let queue = Mutex::new(queue);
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ClientError::Transport("no scripted response left".into()))
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub(crate) fn credential(token: &str) -> Credential {
    Credential::bearer(token, Utc::now() + TimeDelta::hours(1)).with_refresh_token("refresh")
}

/// Auth manager that counts logins and refreshes.
pub(crate) struct CountingAuth {
    current: Mutex<Option<Credential>>,
    login: Option<Credential>,
    refreshed: Option<Credential>,
    delay: Duration,
    logins: AtomicUsize,
    refreshes: AtomicUsize,
}

impl CountingAuth {
    pub(crate) fn new(current: Option<Credential>) -> Self {
        Self {
            current: Mutex::new(current),
            login: None,
            refreshed: None,
            delay: Duration::ZERO,
            logins: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn login_with(mut self, credential: Credential) -> Self {
        self.login = Some(credential);
        self
    }

    pub(crate) fn refresh_to(mut self, credential: Credential) -> Self {
        self.refreshed = Some(credential);
        self
    }

    /// Make logins and refreshes take `delay`.
    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub(crate) fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

impl AuthManager for CountingAuth {
    fn current_credential(&self) -> Option<Credential> {
        self.current.lock().unwrap().clone()
    }

    fn authenticate(&self) -> Result<Credential, AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let credential = self.login.clone().ok_or(AuthError::NotConfigured)?;
        *self.current.lock().unwrap() = Some(credential.clone());
        Ok(credential)
    }

    fn refresh(&self) -> Result<Credential, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let credential = self.refreshed.clone().ok_or(AuthError::NoRefreshToken)?;
        *self.current.lock().unwrap() = Some(credential.clone());
        Ok(credential)
    }
}
