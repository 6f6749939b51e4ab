use std::{collections::BTreeSet, time::Duration};

// Re-export shared types from onepay-types
pub use onepay_types::{
    BalanceSnapshot, CardNetwork, ClientSecret, CustomerSession, DocumentPath,
    PaymentIntentRequest, PaymentIntentResponse, PaymentOutcome, defaults,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PaymentError, Result};

/// Connection state of a balance subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Connecting to the document store
    Connecting,

    /// Receiving snapshots
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Merchant settings handed to the payment sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantConfig {
    /// Platform merchant identifier (e.g. "merchant.org.example")
    pub merchant_identifier: String,

    /// Two-letter ISO country code of the merchant
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Card networks the sheet should accept
    #[serde(default = "CardNetwork::defaults")]
    pub supported_networks: BTreeSet<CardNetwork>,

    /// Name shown on the payment sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

fn default_country_code() -> String {
    defaults::COUNTRY_CODE.to_string()
}

impl MerchantConfig {
    /// Create a merchant configuration with default country and networks
    pub fn new(merchant_identifier: impl Into<String>) -> Self {
        Self {
            merchant_identifier: merchant_identifier.into(),
            country_code: default_country_code(),
            supported_networks: CardNetwork::defaults(),
            display_name: None,
        }
    }

    /// Set the merchant country code
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into().to_ascii_uppercase();
        self
    }

    /// Replace the accepted card networks
    pub fn with_supported_networks(
        mut self,
        networks: impl IntoIterator<Item = CardNetwork>,
    ) -> Self {
        self.supported_networks = networks.into_iter().collect();
        self
    }

    /// Set the name displayed on the sheet
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.merchant_identifier.trim().is_empty() {
            return Err(PaymentError::Config(
                "Merchant identifier is required".to_string(),
            ));
        }

        if self.country_code.len() != 2
            || !self.country_code.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(PaymentError::Config(format!(
                "Invalid country code '{}': expected a 2-letter ISO code",
                self.country_code
            )));
        }

        if self.supported_networks.is_empty() {
            return Err(PaymentError::Config(
                "At least one card network must be supported".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for one deployment of the payment flow
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Backend endpoint creating payment intents
    pub endpoint_url: Url,

    /// Backend endpoint updating an existing intent's amount
    pub update_endpoint_url: Option<Url>,

    /// Merchant settings for the payment sheet
    pub merchant: MerchantConfig,

    /// Upper bound on backend requests (none by default)
    pub request_timeout: Option<Duration>,
}

impl PaymentConfig {
    pub fn new(endpoint_url: Url, merchant: MerchantConfig) -> Self {
        Self {
            endpoint_url,
            update_endpoint_url: None,
            merchant,
            request_timeout: None,
        }
    }

    /// Parse the endpoint and create a configuration
    pub fn parse(endpoint_url: &str, merchant: MerchantConfig) -> Result<Self> {
        let endpoint_url = Url::parse(endpoint_url).map_err(|e| {
            PaymentError::Config(format!("Invalid endpoint URL '{}': {}", endpoint_url, e))
        })?;
        Ok(Self::new(endpoint_url, merchant))
    }

    /// Set the endpoint used to update intents
    pub fn with_update_endpoint(mut self, update_endpoint_url: Url) -> Self {
        self.update_endpoint_url = Some(update_endpoint_url);
        self
    }

    /// Bound every backend request by `timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for url in std::iter::once(&self.endpoint_url).chain(self.update_endpoint_url.as_ref()) {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(PaymentError::Config(format!(
                    "Unsupported endpoint scheme '{}' in {}",
                    url.scheme(),
                    url
                )));
            }
        }
        self.merchant.validate()
    }
}

/// Configuration for the remote document store
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    /// Base URL of the document store
    pub endpoint: Url,

    /// Collection holding balance documents
    pub collection: String,

    /// Field carrying the balance value
    pub field: String,

    /// Bearer token for the document store
    pub token: Option<String>,
}

impl DocumentStoreConfig {
    /// Create a new configuration with the given endpoint
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            collection: defaults::DOCUMENTS_COLLECTION.to_string(),
            field: defaults::BALANCE_FIELD.to_string(),
            token: None,
        }
    }

    /// Parse and check the endpoint, then create a configuration
    pub fn parse(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            PaymentError::Config(format!("Invalid document store URL '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(PaymentError::Config(format!(
                "Unsupported document store scheme '{}' in {}",
                endpoint.scheme(),
                endpoint
            )));
        }
        Ok(Self::new(endpoint))
    }

    /// Set the collection holding balance documents
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the field carrying the balance value
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Path of `document_id` in the configured collection
    pub fn document_path(&self, document_id: &str) -> Result<DocumentPath> {
        Ok(DocumentPath::new(&self.collection, document_id)?)
    }
}
