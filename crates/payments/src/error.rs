use thiserror::Error;

/// Errors that can occur when talking to the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The processor declined the request (card errors, invalid parameters).
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The requested payment intent does not exist.
    #[error("Payment intent not found: {0}")]
    NotFound(String),

    /// The processor answered with an unexpected status.
    #[error("Payment processor error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The processor created an intent without a client secret.
    #[error("Payment intent {0} has no client secret")]
    MissingClientSecret(String),

    /// The request never reached the processor or the response was unreadable.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_includes_status() {
        let err = PaymentError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "Payment processor error (HTTP 503): unavailable"
        );
    }
}
