//! # Marketplace Error Types
//!
//! Typed error handling for the coursecart payment and auth flows.
//! All fallible operations return `Result<T, MarketError>`.

use thiserror::Error;

/// Core error type for all marketplace operations
#[derive(Debug, Error)]
pub enum MarketError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid client input (missing/non-positive checkout fields, bad params)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Gateway could not be reached or answered non-2xx
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Webhook payload could not be verified or decoded
    #[error("Malformed webhook: {0}")]
    MalformedWebhook(String),

    /// Webhook references an order this system never issued
    #[error("Unknown order: {order_id}")]
    UnknownOrder { order_id: String },

    /// Webhook amount/currency disagrees with the checkout record
    #[error("Amount mismatch for order {order_id}: expected {expected}, got {received}")]
    AmountMismatch {
        order_id: String,
        expected: String,
        received: String,
    },

    /// Course not found in catalog
    #[error("Course not found: {course_id}")]
    CourseNotFound { course_id: String },

    /// Username or email already registered
    #[error("User already exists: {0}")]
    DuplicateUser(String),

    /// Login failed (wrong credentials, no password set for OAuth user)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Session or OAuth state token rejected (expired, forged, malformed)
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Returns the HTTP status code appropriate for this error.
    ///
    /// Webhook handlers deliberately override this for `UnknownOrder`
    /// and `AmountMismatch` (acknowledged with 200 so the gateway stops
    /// redelivering).
    pub fn status_code(&self) -> u16 {
        match self {
            MarketError::Configuration(_) => 500,
            MarketError::InvalidRequest(_) => 400,
            MarketError::GatewayUnavailable(_) => 502,
            MarketError::MalformedWebhook(_) => 400,
            MarketError::UnknownOrder { .. } => 404,
            MarketError::AmountMismatch { .. } => 409,
            MarketError::CourseNotFound { .. } => 404,
            MarketError::DuplicateUser(_) => 409,
            MarketError::InvalidCredentials => 401,
            MarketError::InvalidToken(_) => 401,
            MarketError::Internal(_) => 500,
        }
    }

    /// Returns true if the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketError::GatewayUnavailable(_))
    }
}

/// Result type alias for marketplace operations
pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MarketError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(
            MarketError::GatewayUnavailable("timeout".into()).status_code(),
            502
        );
        assert_eq!(
            MarketError::UnknownOrder {
                order_id: "GHOST".into()
            }
            .status_code(),
            404
        );
        assert_eq!(MarketError::InvalidCredentials.status_code(), 401);
    }

    #[test]
    fn test_retryable() {
        assert!(MarketError::GatewayUnavailable("502".into()).is_retryable());
        assert!(!MarketError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn test_amount_mismatch_message() {
        let err = MarketError::AmountMismatch {
            order_id: "ORD-1".into(),
            expected: "90.00 usd".into(),
            received: "9.00 usd".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ORD-1"));
        assert!(msg.contains("90.00 usd"));
    }
}
