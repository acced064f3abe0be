//! Unified error handling for the client core.
//!
//! Provides a single `ClientError` covering the taxonomy the UI layer reacts
//! to: authentication failures, network faults, client-side validation
//! rejections, authorization denials, and missing resources. All operations
//! return `Result<T, ClientError>`; none of these errors is fatal to the
//! process.

use thiserror::Error;

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the submitted credentials.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The persisted session record failed shape validation.
    ///
    /// Only ever surfaced in logs: session restoration degrades silently to
    /// a logged-out state instead of raising this to the caller.
    #[error("persisted session is corrupted: {0}")]
    CorruptedSession(String),

    /// An operation requiring a session ran without one, or the backend no
    /// longer accepts the stored token.
    #[error("session expired, please log in again")]
    SessionExpired,
}

/// Network faults. Always recoverable by re-invoking the user action.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent or the connection dropped.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a status the contract does not define.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Backend-provided message, or a placeholder.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl NetworkError {
    /// Classify a `reqwest` transport error, folding timeouts into their own
    /// category so the UI can word them differently.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}

/// Application-level error type for the client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Request failed or timed out.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Input rejected before (or by) the backend.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Role or ownership mismatch on a protected resource.
    ///
    /// Rendered as an explicit in-place denial, never a navigation redirect.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Missing order, address, or product.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// Whether re-invoking the same user action can succeed without any
    /// other state change.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Validation(_))
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::NotFound("order o1".to_owned());
        assert_eq!(err.to_string(), "Not found: order o1");

        let err = ClientError::Validation("phone is required".to_owned());
        assert_eq!(err.to_string(), "Validation error: phone is required");
    }

    #[test]
    fn test_auth_errors_wrap_into_client_error() {
        let err: ClientError = AuthError::InvalidCredentials.into();
        assert_eq!(err.to_string(), "Auth error: invalid email or password");
    }

    #[test]
    fn test_retryable_categories() {
        assert!(ClientError::Network(NetworkError::Timeout).is_retryable());
        assert!(ClientError::Validation("bad input".to_owned()).is_retryable());
        assert!(!ClientError::Auth(AuthError::SessionExpired).is_retryable());
        assert!(!ClientError::Authorization("not your order".to_owned()).is_retryable());
        assert!(!ClientError::NotFound("gone".to_owned()).is_retryable());
    }

    #[test]
    fn test_unexpected_status_display() {
        let err = NetworkError::UnexpectedStatus {
            status: 502,
            message: "bad gateway".to_owned(),
        };
        assert_eq!(err.to_string(), "unexpected status 502: bad gateway");
    }
}
