//! Typed errors for board synchronization.
//!
//! `GatewayError` covers every way a remote issue call can fail. The board
//! treats all of them the same for rollback purposes; the variants exist for
//! logging and for callers that want to tell them apart.

use std::time::Duration;

use thiserror::Error;

/// Errors from the remote issue gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Not authorized")]
    Unauthorized,

    #[error("Request rejected ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl GatewayError {
    pub fn rejected(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// The backend could not be reached or did not answer in time.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }

    /// The backend answered and refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Rejected { .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_classification() {
        assert!(GatewayError::Network("refused".into()).is_network());
        assert!(
            GatewayError::Timeout {
                after: Duration::from_secs(30)
            }
            .is_network()
        );
        assert!(GatewayError::Unauthorized.is_rejection());
        assert!(GatewayError::rejected(403, "FORBIDDEN", "nope").is_rejection());
        assert!(!GatewayError::Decode("bad json".into()).is_network());
        assert!(!GatewayError::Decode("bad json".into()).is_rejection());
    }

    #[test]
    fn rejected_error_carries_fields() {
        let err = GatewayError::rejected(422, "INVALID_TRANSITION", "Cannot reopen");
        match &err {
            GatewayError::Rejected { status, code, message } => {
                assert_eq!(*status, 422);
                assert_eq!(code, "INVALID_TRANSITION");
                assert_eq!(message, "Cannot reopen");
            }
            _ => panic!("Expected Rejected"),
        }
        assert!(err.to_string().contains("INVALID_TRANSITION"));
    }

    #[test]
    fn timeout_error_mentions_duration() {
        let err = GatewayError::Timeout {
            after: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }
}
