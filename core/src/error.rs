//! Error types for the Stepik API client.
//!
//! # Design
//! Each variant maps to one failure stage of a query: construction, auth,
//! transport, server status, or decoding. Callers branch on the variant to
//! decide between a retry notification and a re-login prompt, so decode
//! failures stay distinct from transport failures.

use thiserror::Error;

/// Errors returned by query builders and the executor.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The query was malformed before anything was sent.
    #[error("invalid query: {0}")]
    Construction(String),

    /// No usable credential and the authentication flow failed.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// The credential was refreshed and still rejected, or could not be
    /// refreshed at all.
    #[error("credential expired: {0}")]
    AuthExpired(String),

    /// Network failure or timeout.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status other than the auth retry.
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The body was received but does not have the expected shape.
    #[error("could not decode {type_name} from response body")]
    Decode { type_name: &'static str, body: String },

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ClientError {
    /// Server or network failures that a user may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Api { .. } | ClientError::Transport(_))
    }

    /// Failures that need the user to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthenticated(_) | ClientError::AuthExpired(_)
        )
    }

    /// HTTP status carried by an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_and_transport_errors_are_retryable() {
        let api = ClientError::Api {
            status: 503,
            body: String::new(),
        };
        assert!(api.is_retryable());
        assert!(!api.requires_login());
        assert!(ClientError::Transport("timed out".into()).is_retryable());
    }

    #[test]
    fn auth_errors_require_login() {
        assert!(ClientError::Unauthenticated("no token".into()).requires_login());
        assert!(ClientError::AuthExpired("rejected".into()).requires_login());
        assert!(!ClientError::Construction("missing id".into()).requires_login());
    }

    #[test]
    fn status_is_only_reported_for_api_errors() {
        let err = ClientError::Api {
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "HTTP 403: forbidden");
        assert_eq!(ClientError::AuthExpired("x".into()).status(), None);
    }
}
