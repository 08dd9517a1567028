//! Client configuration.

use std::time::Duration;

/// OAuth application credentials used by [`crate::OAuthManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Required for the client-credentials grant; refreshes only need the id.
    pub client_secret: Option<String>,
}

/// Settings shared by the transport, the executor and the auth manager.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Platform root, e.g. `https://stepik.org`. A trailing slash is ignored.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Upper bound for a whole request, including reading the body.
    pub request_timeout: Duration,
    pub user_agent: String,
    pub oauth: Option<OAuthConfig>,
    /// HTTP proxy such as `http://proxy.corp:3128`, for networks without a
    /// direct route out.
    pub proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://stepik.org".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("stepik-rust-client/{}", env!("CARGO_PKG_VERSION")),
            oauth: None,
            proxy: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    /// Read `STEPIK_BASE_URL`, `STEPIK_CLIENT_ID`, `STEPIK_CLIENT_SECRET` and
    /// `STEPIK_PROXY`, falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base_url) = lookup("STEPIK_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(client_id) = lookup("STEPIK_CLIENT_ID") {
            config.oauth = Some(OAuthConfig {
                client_id,
                client_secret: lookup("STEPIK_CLIENT_SECRET"),
            });
        }
        config.proxy = lookup("STEPIK_PROXY").filter(|proxy| !proxy.is_empty());
        config
    }

    pub fn with_oauth(mut self, client_id: &str, client_secret: Option<&str>) -> Self {
        self.oauth = Some(OAuthConfig {
            client_id: client_id.to_string(),
            client_secret: client_secret.map(str::to_string),
        });
        self
    }

    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    /// Absolute URL for an API path such as `/api/courses`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    pub fn token_url(&self) -> String {
        self.url("/oauth2/token")
    }
}
