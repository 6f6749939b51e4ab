use tracing::{debug, info};

use crate::{
    client::PaymentIntentClient,
    controller::{PaymentResultController, PaymentSheet, PaymentSummary, PresentationState},
    error::Result,
    types::{PaymentConfig, PaymentIntentRequest, PaymentOutcome},
};

/// Metadata key naming the charity a payment goes to
pub const CHARITY_METADATA_KEY: &str = "charity";

/// One payment flow: request an intent, then present the sheet for it
///
/// Each deployment configures one `Checkout` instead of duplicating the flow
/// per screen. The controller is claimed before the backend is called, so a
/// second tap while an attempt is running fails fast with
/// [`crate::PaymentError::AlreadyInProgress`] and never issues a request.
pub struct Checkout<S> {
    client: PaymentIntentClient,
    controller: PaymentResultController<S>,
}

impl<S: PaymentSheet> Checkout<S> {
    /// Validate `config` and build the client and controller from it
    pub fn new(config: PaymentConfig, sheet: S) -> Result<Self> {
        config.validate()?;
        let merchant = config.merchant.clone();
        let client = PaymentIntentClient::new(config)?;
        Ok(Self::from_parts(
            client,
            PaymentResultController::new(sheet, merchant),
        ))
    }

    pub fn from_parts(client: PaymentIntentClient, controller: PaymentResultController<S>) -> Self {
        Self { client, controller }
    }

    pub fn client(&self) -> &PaymentIntentClient {
        &self.client
    }

    pub fn controller(&self) -> &PaymentResultController<S> {
        &self.controller
    }

    pub fn state(&self) -> PresentationState {
        self.controller.state()
    }

    /// Run one payment attempt to its terminal outcome
    ///
    /// Backend failures are returned as errors and no sheet is presented.
    /// Outcomes of the sheet, including cancellation and failure, are
    /// returned as `Ok`.
    pub async fn pay(&self, request: &PaymentIntentRequest) -> Result<PaymentOutcome> {
        request.validate()?;
        self.controller.ensure_available()?;

        let slot = self.controller.reserve()?;
        debug!(
            amount = request.amount_minor_units(),
            currency = %request.currency(),
            "Starting payment attempt"
        );

        let intent = self.client.request_intent(request).await?;

        let summary = PaymentSummary {
            amount_minor_units: intent.amount_minor_units,
            currency: request.currency().to_string(),
            label: request.metadata().get(CHARITY_METADATA_KEY).cloned(),
        };

        let outcome = slot
            .present(&intent.client_secret, Some(&summary))
            .await?;

        info!(
            amount = intent.amount_minor_units,
            currency = %request.currency(),
            outcome = %outcome,
            "Payment attempt finished"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::*;
    use crate::{
        controller::SheetResult,
        error::PaymentError,
        test::{ScriptedSheet, intent_backend, serve},
        types::MerchantConfig,
    };

    fn checkout_for(base_url: &str, sheet: ScriptedSheet) -> Checkout<ScriptedSheet> {
        let config = PaymentConfig::parse(
            &format!("{}/create-payment-intent", base_url),
            MerchantConfig::new("merchant.org.onepay"),
        )
        .unwrap();
        Checkout::new(config, sheet).unwrap()
    }

    #[tokio::test]
    async fn test_authorized_payment_end_to_end() {
        let (router, _) = intent_backend(StatusCode::OK, r#"{"clientSecret":"secret_abc"}"#);
        let base_url = serve(router).await;
        let sheet = ScriptedSheet::new();
        sheet.push(SheetResult::Completed);
        let checkout = checkout_for(&base_url, sheet);

        let request = PaymentIntentRequest::new(1000, "usd").with_metadata("charity", "mental-help");
        let outcome = checkout.pay(&request).await.unwrap();

        assert_eq!(outcome, PaymentOutcome::Completed);
        assert!(checkout.controller().has_succeeded());

        let presented = checkout.controller().sheet().last_request().unwrap();
        assert_eq!(presented.client_secret, "secret_abc");
        assert_eq!(
            presented.summary,
            Some(PaymentSummary {
                amount_minor_units: 1000,
                currency: "usd".to_string(),
                label: Some("mental-help".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_server_error_skips_presentation() {
        let (router, _) = intent_backend(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        let base_url = serve(router).await;
        let checkout = checkout_for(&base_url, ScriptedSheet::new());

        let error = checkout
            .pay(&PaymentIntentRequest::new(1000, "usd"))
            .await
            .unwrap_err();

        assert!(matches!(error, PaymentError::ServerError { status: 500, .. }));
        assert_eq!(checkout.controller().sheet().presented(), 0);
        assert_eq!(checkout.state(), PresentationState::Idle);
        assert!(!checkout.controller().has_succeeded());
    }

    #[tokio::test]
    async fn test_unavailable_device_never_calls_backend() {
        let (router, recorded) = intent_backend(StatusCode::OK, r#"{"clientSecret":"secret_abc"}"#);
        let base_url = serve(router).await;
        let checkout = checkout_for(&base_url, ScriptedSheet::unavailable());

        let error = checkout
            .pay(&PaymentIntentRequest::new(1000, "usd"))
            .await
            .unwrap_err();

        assert!(matches!(error, PaymentError::Unavailable(_)));
        assert!(recorded.requests().is_empty());
    }

    #[tokio::test]
    async fn test_second_attempt_while_presenting_is_rejected() {
        let (router, recorded) = intent_backend(StatusCode::OK, r#"{"clientSecret":"secret_abc"}"#);
        let base_url = serve(router).await;
        let sheet = ScriptedSheet::new();
        let release_first = sheet.push_pending();
        let checkout = Arc::new(checkout_for(&base_url, sheet));

        let first = {
            let checkout = Arc::clone(&checkout);
            tokio::spawn(async move { checkout.pay(&PaymentIntentRequest::new(1000, "usd")).await })
        };

        checkout
            .controller()
            .subscribe()
            .wait_for(|state| *state == PresentationState::Presenting)
            .await
            .unwrap();

        let second = checkout.pay(&PaymentIntentRequest::new(1000, "usd")).await;
        assert!(matches!(second, Err(PaymentError::AlreadyInProgress)));
        assert_eq!(recorded.requests().len(), 1);

        release_first.send(SheetResult::Canceled).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), PaymentOutcome::Canceled);
        assert!(!checkout.controller().has_succeeded());
    }
}
