use std::{collections::BTreeSet, fs, path::Path, time::Duration};

use onepay_sdk::{
    CardNetwork, DocumentStoreConfig, MerchantConfig, PaymentConfig, defaults,
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variables overriding the manifest
pub mod env {
    pub const ENDPOINT_URL: &str = "ONEPAY_ENDPOINT_URL";
    pub const UPDATE_ENDPOINT_URL: &str = "ONEPAY_UPDATE_ENDPOINT_URL";
    pub const MERCHANT_ID: &str = "ONEPAY_MERCHANT_ID";
    pub const COUNTRY_CODE: &str = "ONEPAY_COUNTRY_CODE";
    pub const SUPPORTED_NETWORKS: &str = "ONEPAY_SUPPORTED_NETWORKS";
    pub const DOCUMENTS_URL: &str = "ONEPAY_DOCUMENTS_URL";
    pub const DOCUMENTS_TOKEN: &str = "ONEPAY_DOCUMENTS_TOKEN";
}

/// OnePay manifest file (OnePay.toml)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Manifest {
    #[serde(default)]
    pub payment: PaymentSection,

    #[serde(default)]
    pub merchant: MerchantSection,

    #[serde(default)]
    pub documents: DocumentsSection,
}

/// Backend endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PaymentSection {
    /// Endpoint creating payment intents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Endpoint updating an existing intent (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_endpoint_url: Option<String>,

    /// Request timeout in seconds (default: none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Currency used when `pay` is not given one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Merchant settings for the payment sheet
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MerchantSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_identifier: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_networks: Option<BTreeSet<CardNetwork>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Remote document store holding balances
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocumentsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Manifest {
    /// Load manifest from the specified OnePay.toml file path
    pub fn load(manifest_file_path: &Path) -> Result<Self, String> {
        if !manifest_file_path.exists() {
            return Err(format!(
                "OnePay.toml not found at {}",
                manifest_file_path.display()
            ));
        }

        let content = fs::read_to_string(manifest_file_path)
            .map_err(|e| format!("Failed to read {}: {}", manifest_file_path.display(), e))?;

        Self::parse(&content)
            .map_err(|e| format!("Failed to parse {}: {}", manifest_file_path.display(), e))
    }

    /// Load the manifest, or use defaults when the file does not exist
    ///
    /// Every setting can also come from the environment, so only a missing
    /// file is tolerated. A file that cannot be read or parsed is an error.
    pub fn load_or_default(manifest_file_path: &Path) -> Result<Self, String> {
        if manifest_file_path.exists() {
            Self::load(manifest_file_path)
        } else {
            tracing::debug!(
                "No manifest at {}, using environment only",
                manifest_file_path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Currency for payments, falling back to the default
    pub fn currency(&self) -> String {
        self.payment
            .currency
            .clone()
            .unwrap_or_else(|| defaults::CURRENCY.to_string())
    }

    /// Resolve the payment configuration, letting `lookup` override the manifest
    pub fn payment_config<F>(&self, lookup: F) -> Result<PaymentConfig, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint_url = lookup(env::ENDPOINT_URL)
            .or_else(|| self.payment.endpoint_url.clone())
            .ok_or_else(|| {
                format!(
                    "No payment endpoint configured: set [payment].endpoint_url or {}",
                    env::ENDPOINT_URL
                )
            })?;

        let merchant_identifier = lookup(env::MERCHANT_ID)
            .or_else(|| self.merchant.merchant_identifier.clone())
            .ok_or_else(|| {
                format!(
                    "No merchant identifier configured: set [merchant].merchant_identifier or {}",
                    env::MERCHANT_ID
                )
            })?;

        let mut merchant = MerchantConfig::new(merchant_identifier);

        if let Some(country_code) =
            lookup(env::COUNTRY_CODE).or_else(|| self.merchant.country_code.clone())
        {
            merchant = merchant.with_country_code(country_code);
        }

        if let Some(networks) = lookup(env::SUPPORTED_NETWORKS) {
            merchant = merchant.with_supported_networks(parse_networks(&networks)?);
        } else if let Some(ref networks) = self.merchant.supported_networks {
            merchant = merchant.with_supported_networks(networks.iter().copied());
        }

        if let Some(ref display_name) = self.merchant.display_name {
            merchant = merchant.with_display_name(display_name);
        }

        let mut config =
            PaymentConfig::parse(&endpoint_url, merchant).map_err(|e| e.to_string())?;

        if let Some(update_endpoint_url) = lookup(env::UPDATE_ENDPOINT_URL)
            .or_else(|| self.payment.update_endpoint_url.clone())
        {
            let url = Url::parse(&update_endpoint_url).map_err(|e| {
                format!("Invalid update endpoint URL '{}': {}", update_endpoint_url, e)
            })?;
            config = config.with_update_endpoint(url);
        }

        if let Some(secs) = self.payment.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    /// Resolve the document store configuration
    pub fn document_store_config<F>(&self, lookup: F) -> Result<DocumentStoreConfig, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(env::DOCUMENTS_URL)
            .or_else(|| self.documents.endpoint.clone())
            .ok_or_else(|| {
                format!(
                    "No document store configured: set [documents].endpoint or {}",
                    env::DOCUMENTS_URL
                )
            })?;

        let mut config = DocumentStoreConfig::parse(&endpoint).map_err(|e| e.to_string())?;
        if let Some(ref collection) = self.documents.collection {
            config = config.with_collection(collection);
        }
        if let Some(ref field) = self.documents.field {
            config = config.with_field(field);
        }
        if let Some(token) = lookup(env::DOCUMENTS_TOKEN) {
            config = config.with_token(token);
        }

        Ok(config)
    }
}

/// Parse a comma-separated list of card networks
fn parse_networks(value: &str) -> Result<Vec<CardNetwork>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<CardNetwork>().map_err(|e| e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const MANIFEST: &str = r#"
[payment]
endpoint_url = "https://backend.example.com/create-payment-intent"
request_timeout_secs = 30

[merchant]
merchant_identifier = "merchant.org.onepay"
supported_networks = ["visa", "masterCard"]
display_name = "One"

[documents]
endpoint = "https://docs.example.com"
collection = "ledgers"
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.payment.request_timeout_secs, Some(30));
        assert_eq!(manifest.currency(), "usd");
        assert_eq!(
            manifest.merchant.supported_networks,
            Some(BTreeSet::from([CardNetwork::Visa, CardNetwork::Mastercard]))
        );
    }

    #[test]
    fn test_payment_config_from_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let config = manifest.payment_config(no_env).unwrap();

        assert_eq!(
            config.endpoint_url.as_str(),
            "https://backend.example.com/create-payment-intent"
        );
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.merchant.country_code, "US");
        assert_eq!(config.merchant.display_name.as_deref(), Some("One"));
        assert!(config.update_endpoint_url.is_none());
    }

    #[test]
    fn test_environment_overrides_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let vars = HashMap::from([
            (env::ENDPOINT_URL, "https://staging.example.com/intents"),
            (env::MERCHANT_ID, "merchant.org.staging"),
            (env::SUPPORTED_NETWORKS, "amex, discover"),
            (env::UPDATE_ENDPOINT_URL, "https://staging.example.com/update"),
        ]);
        let config = manifest
            .payment_config(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.endpoint_url.as_str(), "https://staging.example.com/intents");
        assert_eq!(config.merchant.merchant_identifier, "merchant.org.staging");
        assert_eq!(
            config.merchant.supported_networks,
            BTreeSet::from([CardNetwork::Amex, CardNetwork::Discover])
        );
        assert!(config.update_endpoint_url.is_some());
    }

    #[test]
    fn test_missing_endpoint_is_reported() {
        let manifest = Manifest::default();
        let error = manifest.payment_config(no_env).unwrap_err();
        assert!(error.contains(env::ENDPOINT_URL));
    }

    #[test]
    fn test_unknown_network_is_reported() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let error = manifest
            .payment_config(|key| {
                (key == env::SUPPORTED_NETWORKS).then(|| "visa,bitcoin".to_string())
            })
            .unwrap_err();
        assert!(error.contains("bitcoin"));
    }

    #[test]
    fn test_document_store_config() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let config = manifest
            .document_store_config(|key| {
                (key == env::DOCUMENTS_TOKEN).then(|| "token-1".to_string())
            })
            .unwrap();

        assert_eq!(config.endpoint.as_str(), "https://docs.example.com/");
        assert_eq!(config.collection, "ledgers");
        assert_eq!(config.field, "amount");
        assert_eq!(config.token.as_deref(), Some("token-1"));
    }

    #[test]
    fn test_load_manifest_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("OnePay.toml");
        fs::write(&path, MANIFEST).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.documents.collection.as_deref(), Some("ledgers"));
        assert!(Manifest::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_missing_manifest_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::load_or_default(&dir.path().join("OnePay.toml")).unwrap();
        assert_eq!(manifest, Manifest::default());
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("OnePay.toml");
        fs::write(&path, "[payment\nendpoint_url = ").unwrap();

        let error = Manifest::load_or_default(&path).unwrap_err();
        assert!(error.starts_with("Failed to parse"), "{}", error);
    }
}
