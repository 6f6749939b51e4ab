//! OnePay SDK
//!
//! This crate provides client-side abstractions for collecting a payment
//! through a payment-intent backend and a platform payment sheet, and for
//! following a balance kept in a remote document store.
//!
//! # Overview
//!
//! The SDK provides four main abstractions:
//!
//! - [`PaymentIntentClient`] - Asks the backend for a payment intent and its client secret
//! - [`PaymentResultController`] - Presents a [`PaymentSheet`] and classifies its result
//! - [`Checkout`] - One configured payment flow combining the two
//! - [`BalanceSubscription`] - Follows a balance field as a stream of snapshots
//!
//! # Quick Start
//!
//! ## Taking a Payment
//!
//! ```ignore
//! use onepay_sdk::{Checkout, MerchantConfig, PaymentConfig, PaymentIntentRequest, PaymentOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Configure the deployment
//!     let merchant = MerchantConfig::new("merchant.org.example").with_country_code("US");
//!     let config = PaymentConfig::parse("https://backend.example.com/create-payment-intent", merchant)?;
//!
//!     // `sheet` is the platform's PaymentSheet implementation
//!     let checkout = Checkout::new(config, sheet)?;
//!
//!     let request = PaymentIntentRequest::new(1000, "usd").with_metadata("charity", "mental-help");
//!     match checkout.pay(&request).await {
//!         Ok(PaymentOutcome::Completed) => println!("Thank you!"),
//!         Ok(PaymentOutcome::Canceled) => {}
//!         Ok(outcome) => println!("{}", outcome.user_message().unwrap_or_default()),
//!         Err(e) => println!("{}", e.user_message().unwrap_or_default()),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Following a Balance
//!
//! ```ignore
//! use futures::StreamExt;
//! use onepay_sdk::{BalanceSubscription, DocumentStoreConfig};
//!
//! let subscription = BalanceSubscription::new(DocumentStoreConfig::parse("https://docs.example.com")?);
//! let mut balances = subscription.subscribe(subscription.document_path("user-42")?);
//!
//! while let Some(snapshot) = balances.next().await {
//!     println!("Balance: {}", snapshot.value);
//! }
//! ```
//!
//! # Errors
//!
//! Every failure is terminal for the attempt that hit it; nothing is retried
//! automatically. [`PaymentError::user_message`] gives the text safe to show
//! the end user: backend failures collapse to a generic message and
//! cancellation shows nothing.

pub mod balance;
pub mod checkout;
pub mod client;
pub mod controller;
pub mod error;
pub mod types;

#[cfg(test)]
mod test;

// Re-export main types at crate root
pub use balance::{BalanceStream, BalanceSubscription};
pub use checkout::Checkout;
pub use client::PaymentIntentClient;
pub use controller::{
    PaymentResultController, PaymentSheet, PaymentSummary, PresentationSlot, PresentationState,
    SheetRequest, SheetResult,
};
pub use error::{PaymentError, Result};
pub use types::{
    BalanceSnapshot, CardNetwork, ClientSecret, ConnectionState, CustomerSession, DocumentPath,
    DocumentStoreConfig, MerchantConfig, PaymentConfig, PaymentIntentRequest,
    PaymentIntentResponse, PaymentOutcome, defaults,
};
