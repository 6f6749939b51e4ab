use std::collections::{BTreeSet, HashSet};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    error::{PaymentError, Result},
    types::{CardNetwork, ClientSecret, MerchantConfig, PaymentOutcome},
};

/// Raw result reported by a payment sheet
#[derive(Debug)]
pub enum SheetResult {
    /// The user authorized the payment
    Completed,

    /// The user dismissed the sheet
    Canceled,

    /// Authorization failed with the platform's error
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl From<SheetResult> for PaymentOutcome {
    fn from(result: SheetResult) -> Self {
        match result {
            SheetResult::Completed => PaymentOutcome::Completed,
            SheetResult::Canceled => PaymentOutcome::Canceled,
            SheetResult::Failed(error) => {
                let reason = error.to_string();
                if reason.trim().is_empty() {
                    PaymentOutcome::failed("Unknown error")
                } else {
                    PaymentOutcome::failed(reason)
                }
            }
        }
    }
}

/// Line shown on the sheet for the amount being authorized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSummary {
    pub amount_minor_units: u64,
    pub currency: String,
    pub label: Option<String>,
}

/// Everything a sheet needs to authorize one payment
#[derive(Debug, Clone, Copy)]
pub struct SheetRequest<'a> {
    pub client_secret: &'a ClientSecret,
    pub merchant: &'a MerchantConfig,
    pub summary: Option<&'a PaymentSummary>,
}

/// Platform payment-authorization surface
///
/// Implementations present their UI for the given client secret and resolve
/// once the user authorizes, cancels, or authorization fails.
pub trait PaymentSheet: Send + Sync {
    /// Whether the device can pay with any of `networks`
    fn can_make_payments(&self, _networks: &BTreeSet<CardNetwork>) -> bool {
        true
    }

    fn present(&self, request: SheetRequest<'_>) -> impl Future<Output = SheetResult> + Send;
}

/// Observable state of a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationState {
    /// Nothing in progress
    Idle,

    /// An attempt holds the controller while its intent is requested
    Preparing,

    /// The payment sheet is on screen
    Presenting,

    /// The last presentation ended with this outcome
    Finished(PaymentOutcome),
}

impl PresentationState {
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            PresentationState::Preparing | PresentationState::Presenting
        )
    }
}

#[derive(Default)]
struct Inner {
    in_progress: bool,
    /// Fingerprints of every presented secret, never pruned
    used_secrets: HashSet<String>,
    succeeded: bool,
}

/// Drives a payment sheet to completion and classifies its result
///
/// A controller presents at most one sheet at a time. A second call while a
/// presentation is active fails with [`PaymentError::AlreadyInProgress`] and
/// leaves the active one untouched. Client secrets are single-use: once one
/// reached a terminal outcome, presenting it again fails with
/// [`PaymentError::SecretAlreadyUsed`].
///
/// Used secrets are remembered as 12-character fingerprints for the lifetime
/// of the controller, so a long-lived controller keeps one entry per
/// presented payment. Create a new controller to start from a clean slate.
///
/// # Example
///
/// ```ignore
/// let controller = PaymentResultController::new(sheet, merchant);
/// let mut states = controller.subscribe();
///
/// match controller.present(&intent.client_secret).await? {
///     PaymentOutcome::Completed => show_thank_you(),
///     PaymentOutcome::Canceled => {}
///     PaymentOutcome::Failed { reason } => show_error(&reason),
/// }
/// ```
pub struct PaymentResultController<S> {
    /// Platform sheet
    sheet: S,

    /// Merchant settings handed to the sheet
    merchant: MerchantConfig,

    inner: Mutex<Inner>,

    /// Publishes every state change
    state_tx: watch::Sender<PresentationState>,
}

impl<S: PaymentSheet> PaymentResultController<S> {
    pub fn new(sheet: S, merchant: MerchantConfig) -> Self {
        let (state_tx, _) = watch::channel(PresentationState::Idle);

        Self {
            sheet,
            merchant,
            inner: Mutex::new(Inner::default()),
            state_tx,
        }
    }

    pub fn merchant(&self) -> &MerchantConfig {
        &self.merchant
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    /// Current state
    pub fn state(&self) -> PresentationState {
        self.state_tx.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<PresentationState> {
        self.state_tx.subscribe()
    }

    pub fn is_in_progress(&self) -> bool {
        self.inner.lock().in_progress
    }

    /// Whether any presentation of this controller completed
    pub fn has_succeeded(&self) -> bool {
        self.inner.lock().succeeded
    }

    /// Outcome of the last finished presentation
    pub fn last_outcome(&self) -> Option<PaymentOutcome> {
        match &*self.state_tx.borrow() {
            PresentationState::Finished(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Fail unless the device can pay with the configured networks
    pub fn ensure_available(&self) -> Result<()> {
        if self
            .sheet
            .can_make_payments(&self.merchant.supported_networks)
        {
            Ok(())
        } else {
            Err(PaymentError::Unavailable(
                "No supported payment method is set up on this device".to_string(),
            ))
        }
    }

    /// Claim the controller for one payment attempt
    ///
    /// The returned slot keeps the controller busy until it is consumed by
    /// [`PresentationSlot::present`] or dropped.
    pub fn reserve(&self) -> Result<PresentationSlot<'_, S>> {
        {
            let mut inner = self.inner.lock();
            if inner.in_progress {
                warn!("Payment already in progress, rejecting new attempt");
                return Err(PaymentError::AlreadyInProgress);
            }
            inner.in_progress = true;
        }
        let previous = self.state_tx.send_replace(PresentationState::Preparing);

        Ok(PresentationSlot {
            controller: self,
            presented: None,
            previous,
            released: false,
        })
    }

    /// Present the sheet for `client_secret` and wait for its outcome
    pub async fn present(&self, client_secret: &ClientSecret) -> Result<PaymentOutcome> {
        self.present_with_summary(client_secret, None).await
    }

    /// Like [`Self::present`], showing `summary` on the sheet
    pub async fn present_with_summary(
        &self,
        client_secret: &ClientSecret,
        summary: Option<&PaymentSummary>,
    ) -> Result<PaymentOutcome> {
        self.check_unused(client_secret)?;
        self.reserve()?.present(client_secret, summary).await
    }

    fn check_unused(&self, client_secret: &ClientSecret) -> Result<()> {
        if self
            .inner
            .lock()
            .used_secrets
            .contains(&client_secret.fingerprint())
        {
            warn!(client_secret = %client_secret, "Client secret was already used");
            return Err(PaymentError::SecretAlreadyUsed);
        }
        Ok(())
    }
}

/// Exclusive claim on a controller for one payment attempt
///
/// Dropping the slot before the sheet resolves (for example when the caller
/// times out) returns the controller to idle. A secret that reached the
/// sheet counts as used either way.
pub struct PresentationSlot<'a, S: PaymentSheet> {
    controller: &'a PaymentResultController<S>,

    /// Fingerprint of the secret handed to the sheet
    presented: Option<String>,

    /// State to restore if the slot is dropped before presenting
    previous: PresentationState,

    released: bool,
}

impl<S: PaymentSheet> PresentationSlot<'_, S> {
    /// Present the sheet and classify its result
    pub async fn present(
        mut self,
        client_secret: &ClientSecret,
        summary: Option<&PaymentSummary>,
    ) -> Result<PaymentOutcome> {
        let controller = self.controller;
        controller.check_unused(client_secret)?;

        self.presented = Some(client_secret.fingerprint());
        controller
            .state_tx
            .send_replace(PresentationState::Presenting);
        info!(client_secret = %client_secret, "Presenting payment sheet");

        let result = controller
            .sheet
            .present(SheetRequest {
                client_secret,
                merchant: &controller.merchant,
                summary,
            })
            .await;

        let outcome = PaymentOutcome::from(result);
        info!(client_secret = %client_secret, outcome = %outcome, "Payment sheet finished");

        self.release(Some(&outcome));
        Ok(outcome)
    }

    fn release(&mut self, outcome: Option<&PaymentOutcome>) {
        if self.released {
            return;
        }
        self.released = true;

        let presented = {
            let mut inner = self.controller.inner.lock();
            inner.in_progress = false;
            if outcome.is_some_and(PaymentOutcome::is_completed) {
                inner.succeeded = true;
            }
            match self.presented.take() {
                Some(fingerprint) => {
                    inner.used_secrets.insert(fingerprint);
                    true
                }
                None => false,
            }
        };

        // A slot that never reached the sheet leaves the last outcome visible
        let state = match outcome {
            Some(outcome) => PresentationState::Finished(outcome.clone()),
            None if presented => PresentationState::Idle,
            None => std::mem::replace(&mut self.previous, PresentationState::Idle),
        };
        self.controller.state_tx.send_replace(state);
    }
}

impl<S: PaymentSheet> Drop for PresentationSlot<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            if self.presented.is_some() {
                warn!("Payment sheet abandoned before it resolved");
            }
            self.release(None);
        }
    }
}
