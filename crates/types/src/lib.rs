//! Shared data model for OnePay.
//!
//! These types travel between the payment-intent backend, the SDK and the
//! front-ends. They carry no I/O; the SDK crate owns the network and
//! presentation logic.

pub mod balance;
pub mod error;
pub mod intent;
pub mod network;
pub mod outcome;

pub use balance::{BalanceSnapshot, DocumentPath};
pub use error::ValidationError;
pub use intent::{ClientSecret, CustomerSession, PaymentIntentRequest, PaymentIntentResponse};
pub use network::CardNetwork;
pub use outcome::PaymentOutcome;

/// Default values shared by the SDK and the CLI
pub mod defaults {
    /// Currency used when none is configured
    pub const CURRENCY: &str = "usd";

    /// Merchant country used when none is configured
    pub const COUNTRY_CODE: &str = "US";

    /// Collection holding the watched balance documents
    pub const DOCUMENTS_COLLECTION: &str = "payments";

    /// Document field carrying the balance value
    pub const BALANCE_FIELD: &str = "amount";
}
