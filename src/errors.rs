//! Storewarden error types.

use crate::protocol::app_store::VerificationStatus;
use thiserror::Error;

/// Errors that can occur while configuring or running license validation.
///
/// Most per-request problems never surface as an error: validators fold
/// them into a `false` verdict. The variants here are either startup
/// failures or signals that a validator hit a logic defect.
#[derive(Debug, Error)]
pub enum LicensingError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Play Console public key could not be decoded as an RSA key.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Partner API unreachable, timed out, or returned an unusable body.
    #[error("Partner API error: {0}")]
    PartnerApi(String),

    /// Partner API answered and refused the session ticket.
    #[error("Ticket rejected by partner API ({errorcode}): {errordesc}")]
    TicketRejected {
        /// Partner API error code.
        errorcode: i64,
        /// Partner API error description.
        errordesc: String,
    },

    /// Signed transaction verification failed with a typed status.
    #[error("Receipt verification failed: {0}")]
    ReceiptVerification(VerificationStatus),

    /// Receipt verification ran out of attempts without a terminal outcome.
    #[error("Receipt verification exhausted its attempts without a verdict")]
    VerificationExhausted,

    /// The inbound platform selector was absent or not recognized.
    #[error("No licensing platform for selector {0:?}")]
    MissingPlatform(Option<String>),
}
