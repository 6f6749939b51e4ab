use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    error::{PaymentError, Result},
    types::{
        ClientSecret, CustomerSession, PaymentConfig, PaymentIntentRequest, PaymentIntentResponse,
    },
};

/// Client for the backend payment-intent endpoint
///
/// The backend is the authority for amount, currency and charity; the
/// client only forwards the request and hands back the issued secret.
/// Nothing is retried: on error, the caller decides whether to ask again.
///
/// # Example
///
/// ```ignore
/// use onepay_sdk::{MerchantConfig, PaymentConfig, PaymentIntentClient, PaymentIntentRequest};
///
/// let config = PaymentConfig::parse(
///     "https://backend.example.com/create-payment-intent",
///     MerchantConfig::new("merchant.org.example"),
/// )?;
/// let client = PaymentIntentClient::new(config)?;
///
/// let request = PaymentIntentRequest::new(1000, "usd").with_metadata("charity", "mental-help");
/// let intent = client.request_intent(&request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PaymentIntentClient {
    /// Configuration
    config: PaymentConfig,

    /// HTTP client for backend requests
    http_client: reqwest::Client,
}

impl PaymentIntentClient {
    /// Create a client, applying the configured request timeout
    pub fn new(config: PaymentConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| PaymentError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client around an existing HTTP client
    pub fn with_http_client(config: PaymentConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Ask the backend to create a payment intent
    pub async fn request_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntentResponse> {
        request.validate()?;
        self.post_intent(&self.config.endpoint_url, request).await
    }

    /// Ask the backend to change the amount of an intent it already issued
    ///
    /// The response is handled exactly like [`Self::request_intent`]'s.
    pub async fn update_intent(
        &self,
        payment_intent_id: &str,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntentResponse> {
        let url = self.config.update_endpoint_url.as_ref().ok_or_else(|| {
            PaymentError::Config("No update endpoint configured".to_string())
        })?;

        let request = request.with_payment_intent_id(payment_intent_id);
        request.validate()?;
        self.post_intent(url, &request).await
    }

    async fn post_intent(
        &self,
        url: &Url,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntentResponse> {
        debug!(
            url = %url,
            amount = request.amount_minor_units(),
            currency = %request.currency(),
            update = request.payment_intent_id().is_some(),
            "Requesting payment intent"
        );

        let response = self
            .http_client
            .post(url.clone())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .inspect_err(|e| error!(url = %url, error = %e, "Payment intent request failed"))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = PaymentError::server(status.as_u16(), &body);
            warn!(url = %url, status = status.as_u16(), "Backend rejected payment intent request");
            if let PaymentError::ServerError { ref body, .. } = error {
                debug!(url = %url, body = %body, "Backend error body");
            }
            return Err(error);
        }

        let intent = parse_intent_response(&body, request.amount_minor_units())?;

        info!(
            client_secret = %intent.client_secret,
            amount = intent.amount_minor_units,
            payment_intent_id = ?intent.payment_intent_id,
            "Payment intent issued"
        );

        Ok(intent)
    }
}

/// Parse a 2xx backend body into a payment intent
///
/// Only `clientSecret` is required. Known optional fields are picked up when
/// they have the expected type; everything else lands in `extra`.
pub fn parse_intent_response(body: &str, requested_amount: u64) -> Result<PaymentIntentResponse> {
    let value: JsonValue = serde_json::from_str(body).map_err(|e| {
        PaymentError::MalformedResponse(format!("Body is not valid JSON: {}", e))
    })?;

    let JsonValue::Object(mut fields) = value else {
        return Err(PaymentError::MalformedResponse(
            "Body is not a JSON object".to_string(),
        ));
    };

    let client_secret = match fields.remove("clientSecret") {
        Some(JsonValue::String(secret)) => ClientSecret::new(secret),
        Some(_) => {
            return Err(PaymentError::MalformedResponse(
                "clientSecret is not a string".to_string(),
            ));
        }
        None => {
            return Err(PaymentError::MalformedResponse(
                "Missing clientSecret field".to_string(),
            ));
        }
    };

    if client_secret.is_empty() {
        return Err(PaymentError::MalformedResponse(
            "clientSecret is empty".to_string(),
        ));
    }

    let amount_minor_units = match fields.get("amount").and_then(JsonValue::as_u64) {
        Some(amount) => {
            fields.remove("amount");
            amount
        }
        None => requested_amount,
    };

    let payment_intent_id = take_string(&mut fields, "paymentIntentID")
        .or_else(|| take_string(&mut fields, "paymentIntentId"));
    let publishable_key = take_string(&mut fields, "publishableKey");

    let customer = match (
        take_string(&mut fields, "customer"),
        take_string(&mut fields, "ephemeralKey"),
    ) {
        (Some(id), Some(ephemeral_key)) => Some(CustomerSession {
            id,
            ephemeral_key: ClientSecret::new(ephemeral_key),
        }),
        (Some(id), None) => {
            fields.insert("customer".to_string(), JsonValue::String(id));
            None
        }
        (None, Some(ephemeral_key)) => {
            fields.insert("ephemeralKey".to_string(), JsonValue::String(ephemeral_key));
            None
        }
        (None, None) => None,
    };

    Ok(PaymentIntentResponse {
        client_secret,
        amount_minor_units,
        payment_intent_id,
        publishable_key,
        customer,
        extra: fields.into_iter().collect::<IndexMap<_, _>>(),
    })
}

/// Remove `key` from `fields` if it holds a string
fn take_string(fields: &mut serde_json::Map<String, JsonValue>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(JsonValue::String(_)) => match fields.remove(key) {
            Some(JsonValue::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}
