use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal result of presenting a payment sheet
///
/// Once produced, an outcome is only reported, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// The user authorized the payment
    Completed,

    /// The user dismissed the sheet
    Canceled,

    /// Authorization failed; `reason` is human readable
    Failed { reason: String },
}

impl PaymentOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        PaymentOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PaymentOutcome::Completed)
    }

    /// Message to show the end user, if any
    ///
    /// Cancellation is silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            PaymentOutcome::Completed => Some("Payment complete!".to_string()),
            PaymentOutcome::Canceled => None,
            PaymentOutcome::Failed { reason } => Some(format!("Payment failed: {}", reason)),
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentOutcome::Completed => write!(f, "completed"),
            PaymentOutcome::Canceled => write!(f, "canceled"),
            PaymentOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_silent() {
        assert_eq!(PaymentOutcome::Canceled.user_message(), None);
    }

    #[test]
    fn test_failed_message_carries_reason() {
        let outcome = PaymentOutcome::failed("Your card was declined.");
        assert_eq!(
            outcome.user_message().as_deref(),
            Some("Payment failed: Your card was declined.")
        );
        assert!(!outcome.is_completed());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(PaymentOutcome::failed("declined")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "reason": "declined"}));
        let json = serde_json::to_value(PaymentOutcome::Completed).unwrap();
        assert_eq!(json, serde_json::json!({"status": "completed"}));
    }
}
