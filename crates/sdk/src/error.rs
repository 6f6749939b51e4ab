use onepay_types::{PaymentOutcome, ValidationError};
use thiserror::Error;

/// Longest server body kept for diagnostics
pub const MAX_DIAGNOSTIC_BODY_LEN: usize = 512;

/// Message shown to end users for any backend failure
pub const PAYMENT_UNAVAILABLE_MESSAGE: &str = "Payment unavailable, please try again.";

/// Errors that can occur while taking a payment
///
/// Every error is terminal for the current attempt; nothing is retried
/// automatically.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// The request was rejected before leaving the client
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// Transport failure (no response, timeout, DNS, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Body is not JSON, or lacks a usable client secret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Backend answered with a non-2xx status
    #[error("Server error: HTTP {status}: {body}")]
    ServerError { status: u16, body: String },

    /// A payment sheet is already presented by this controller
    #[error("A payment is already in progress")]
    AlreadyInProgress,

    /// The client secret already reached a terminal outcome
    #[error("Client secret was already used")]
    SecretAlreadyUsed,

    /// The device cannot pay with the configured networks
    #[error("Payment unavailable: {0}")]
    Unavailable(String),

    /// Authorization failed
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// The user dismissed the payment sheet
    #[error("Payment canceled")]
    PaymentCanceled,

    /// Balance subscription failed
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Build a server error, truncating the body kept for diagnostics
    pub fn server(status: u16, body: &str) -> Self {
        let body = if body.chars().count() > MAX_DIAGNOSTIC_BODY_LEN {
            let truncated: String = body.chars().take(MAX_DIAGNOSTIC_BODY_LEN).collect();
            format!("{}…", truncated)
        } else {
            body.to_string()
        };
        PaymentError::ServerError { status, body }
    }

    /// Map a terminal outcome to `Ok` for success and an error otherwise
    pub fn check_outcome(outcome: &PaymentOutcome) -> Result<()> {
        match outcome {
            PaymentOutcome::Completed => Ok(()),
            PaymentOutcome::Canceled => Err(PaymentError::PaymentCanceled),
            PaymentOutcome::Failed { reason } => Err(PaymentError::PaymentFailed(reason.clone())),
        }
    }

    /// Message safe to show the end user
    ///
    /// Backend failures collapse to one generic message so raw backend text
    /// never reaches the user. Cancellation shows nothing.
    pub fn user_message(&self) -> Option<String> {
        match self {
            PaymentError::Network(_)
            | PaymentError::MalformedResponse(_)
            | PaymentError::ServerError { .. } => Some(PAYMENT_UNAVAILABLE_MESSAGE.to_string()),
            PaymentError::PaymentCanceled => None,
            PaymentError::PaymentFailed(reason) => Some(format!("Payment failed: {}", reason)),
            PaymentError::Unavailable(reason) => Some(reason.clone()),
            PaymentError::InvalidRequest(e) => Some(e.to_string()),
            PaymentError::AlreadyInProgress => Some("A payment is already in progress.".to_string()),
            PaymentError::SecretAlreadyUsed
            | PaymentError::Subscription(_)
            | PaymentError::Config(_) => Some(PAYMENT_UNAVAILABLE_MESSAGE.to_string()),
        }
    }
}

/// Result type alias for payment operations
pub type Result<T> = std::result::Result<T, PaymentError>;
