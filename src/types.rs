//! Shared error and result types for the signer daemon

use thiserror::Error;

/// Errors surfaced by the signer core
///
/// Every variant is resolved at the router boundary and turned into an HTTP
/// response; none of them should take the serving process down.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Empty or malformed request input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The user declined the transaction in the signer UI
    #[error("Transaction rejected by user")]
    Unauthorized,

    /// No outcome arrived before the configured wait elapsed
    #[error("Request abandoned: {0}")]
    Abandoned(String),

    /// Another approval is in flight and the queue policy is `reject`
    #[error("Another transaction is awaiting approval")]
    Busy,

    /// The cryptographic signer reported a failure
    #[error("Signer failure: {0}")]
    Signer(String),

    /// Account creation or unlock failed
    #[error("Account error: {0}")]
    Account(String),

    /// Activation URL could not be parsed or used the wrong scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid daemon configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SignerError>;
