use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Top-level keys of the request body that metadata may not shadow
pub const RESERVED_BODY_KEYS: &[&str] = &["amount", "currency", "paymentIntentID"];

/// Request for the backend to create, or update, a payment intent
///
/// Serializes to the backend wire format, with metadata flattened next to
/// the amount and currency:
///
/// ```text
/// {"amount": 1000, "currency": "usd", "charity": "cancer-research"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentIntentRequest {
    #[serde(rename = "amount")]
    amount_minor_units: u64,

    currency: String,

    /// Set when the request updates an intent the backend already issued
    #[serde(rename = "paymentIntentID", skip_serializing_if = "Option::is_none")]
    payment_intent_id: Option<String>,

    #[serde(flatten)]
    metadata: IndexMap<String, String>,
}

impl PaymentIntentRequest {
    /// Create a request for `amount_minor_units` (e.g. cents) of `currency`
    pub fn new(amount_minor_units: u64, currency: impl Into<String>) -> Self {
        Self {
            amount_minor_units,
            currency: currency.into().trim().to_ascii_lowercase(),
            payment_intent_id: None,
            metadata: IndexMap::new(),
        }
    }

    /// Attach a metadata entry, such as the selected charity
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Turn this request into an update of an existing payment intent
    pub fn with_payment_intent_id(mut self, payment_intent_id: impl Into<String>) -> Self {
        self.payment_intent_id = Some(payment_intent_id.into());
        self
    }

    pub fn amount_minor_units(&self) -> u64 {
        self.amount_minor_units
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    /// Check the request before it is sent
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount_minor_units == 0 {
            return Err(ValidationError::InvalidAmount);
        }

        if self.currency.is_empty() {
            return Err(ValidationError::MissingCurrency);
        }

        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }

        if let Some(key) = self
            .metadata
            .keys()
            .find(|key| RESERVED_BODY_KEYS.contains(&key.as_str()))
        {
            return Err(ValidationError::ReservedMetadataKey(key.clone()));
        }

        Ok(())
    }
}

/// Opaque, single-use credential issued by the payment backend
///
/// The raw value is only reachable through [`ClientSecret::expose_secret`].
/// `Debug` and `Display` print a redacted form, and the type cannot be
/// serialized, so it never ends up in logs or on disk by accident.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, to hand to the payment sheet and nothing else
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Short SHA-256 fingerprint, stable for a given secret
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Display for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only long secrets reveal a prefix
        if self.0.chars().count() > 8 {
            let prefix: String = self.0.chars().take(3).collect();
            write!(f, "{}…[{}]", prefix, self.fingerprint())
        } else {
            write!(f, "…[{}]", self.fingerprint())
        }
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientSecret({})", self)
    }
}

/// Customer session returned alongside some payment intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSession {
    /// Backend customer identifier
    pub id: String,

    /// Ephemeral key scoped to the customer, redacted like a client secret
    pub ephemeral_key: ClientSecret,
}

/// Payment intent issued by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentResponse {
    /// Secret binding the payment sheet to this intent
    pub client_secret: ClientSecret,

    /// Amount echoed by the backend, or the requested amount when absent
    pub amount_minor_units: u64,

    /// Backend identifier of the intent, used for later updates
    pub payment_intent_id: Option<String>,

    /// Publishable key the payment sheet should use, if the backend selects it
    pub publishable_key: Option<String>,

    /// Customer session, if the backend attached one
    pub customer: Option<CustomerSession>,

    /// Any other fields, passed through untouched
    pub extra: IndexMap<String, JsonValue>,
}

impl PaymentIntentResponse {
    pub fn new(client_secret: ClientSecret, amount_minor_units: u64) -> Self {
        Self {
            client_secret,
            amount_minor_units,
            payment_intent_id: None,
            publishable_key: None,
            customer: None,
            extra: IndexMap::new(),
        }
    }
}
