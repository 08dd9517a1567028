//! HTTP types and the blocking transport.
//!
//! # Design
//! Requests and responses are plain data. Query builders produce
//! `HttpRequest` values without touching the network, and the executor hands
//! them to a [`Transport`]. `UreqTransport` is the production implementation;
//! tests plug in scripted transports instead.

use std::fmt;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// POST and PUT carry their parameters in a JSON body.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One synchronous HTTP round trip.
///
/// Implementations must return 4xx/5xx responses as `Ok` values; only
/// network-level failures are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Blocking transport on top of a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .timeout_global(Some(config.request_timeout))
            .proxy(proxy(config))
            .build()
            .new_agent();

        Self {
            agent,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// The configured proxy. An unparsable one is logged and skipped.
fn proxy(config: &ClientConfig) -> Option<ureq::Proxy> {
    let url = config.proxy.as_deref()?;
    ureq::Proxy::new(url)
        .inspect_err(|e| tracing::warn!(proxy = url, error = %e, "ignoring invalid proxy"))
        .ok()
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
    user_agent: &str,
) -> ureq::RequestBuilder<B> {
    builder = builder.header("user-agent", user_agent);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let url = request.url.as_str();
        let ua = self.user_agent.as_str();
        let body = request.body.as_deref().map(str::as_bytes);

        let result = match (request.method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), request, ua).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), request, ua).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), request, ua).send(body)
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), request, ua).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), request, ua).send(body)
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), request, ua).send_empty(),
        };
        let mut response = result.map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
