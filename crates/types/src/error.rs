use thiserror::Error;

/// Errors raised while validating data before it leaves the client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be a positive number of minor units")]
    InvalidAmount,

    #[error("Currency code is required")]
    MissingCurrency,

    #[error("Invalid currency code '{0}': expected a 3-letter ISO code")]
    InvalidCurrency(String),

    #[error("Metadata key '{0}' is reserved")]
    ReservedMetadataKey(String),

    #[error("Invalid document path '{0}': expected collection/document segments")]
    InvalidDocumentPath(String),

    #[error("Unknown card network '{0}'")]
    UnknownCardNetwork(String),
}
