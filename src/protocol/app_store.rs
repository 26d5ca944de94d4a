//! App Store signed transaction types and the verifier seam.

use serde::Deserialize;
use std::fmt;

/// App Store environment a transaction was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Live App Store purchases.
    Production,
    /// TestFlight and sandbox tester purchases.
    Sandbox,
}

impl Environment {
    /// Name as it appears in the transaction payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "Production",
            Self::Sandbox => "Sandbox",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a signed transaction failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStatus {
    /// Signature, chain or validity check failed.
    VerificationFailure,
    /// Bundle id or app id did not match the verifier.
    InvalidAppIdentifier,
    /// Transaction environment did not match the verifier.
    InvalidEnvironment,
    /// Certificate chain had the wrong length.
    InvalidChainLength,
    /// A certificate in the chain could not be decoded.
    InvalidCertificate,
    /// Any other failure.
    Failure,
    /// Transient failure (e.g. revocation lookup unavailable). Safe to retry offline.
    RetryableVerificationFailure,
}

impl VerificationStatus {
    /// Status name as used by App Store tooling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationFailure => "VERIFICATION_FAILURE",
            Self::InvalidAppIdentifier => "INVALID_APP_IDENTIFIER",
            Self::InvalidEnvironment => "INVALID_ENVIRONMENT",
            Self::InvalidChainLength => "INVALID_CHAIN_LENGTH",
            Self::InvalidCertificate => "INVALID_CERTIFICATE",
            Self::Failure => "FAILURE",
            Self::RetryableVerificationFailure => "RETRYABLE_VERIFICATION_FAILURE",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded payload of a signed transaction.
///
/// Only the fields this crate logs or checks are typed; the rest of the
/// payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    /// Unique id of this transaction.
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Id of the original purchase.
    #[serde(default)]
    pub original_transaction_id: Option<String>,
    /// Bundle identifier of the app.
    #[serde(default)]
    pub bundle_id: Option<String>,
    /// Purchased product.
    #[serde(default)]
    pub product_id: Option<String>,
    /// Purchase time, Unix milliseconds.
    #[serde(default)]
    pub purchase_date: Option<i64>,
    /// Subscription expiry, Unix milliseconds.
    #[serde(default)]
    pub expires_date: Option<i64>,
    /// Time the App Store signed the payload, Unix milliseconds.
    #[serde(default)]
    pub signed_date: Option<i64>,
    /// Refund or revocation time, Unix milliseconds.
    #[serde(default)]
    pub revocation_date: Option<i64>,
    /// Product type, e.g. `Non-Consumable`.
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
    /// `PURCHASED` or `FAMILY_SHARED`.
    #[serde(default)]
    pub in_app_ownership_type: Option<String>,
    /// Environment name, e.g. `Production`.
    #[serde(default)]
    pub environment: Option<String>,
    /// Storefront country code.
    #[serde(default)]
    pub storefront: Option<String>,
}

/// Everything a verifier is bound to for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct VerifierSettings<'a> {
    /// Trusted root certificates, DER-encoded.
    pub root_certificates: &'a [Vec<u8>],
    /// Whether online checks (current-time validity, revocation) apply.
    pub online: bool,
    /// Environment the transaction must belong to.
    pub environment: Environment,
    /// Expected bundle identifier.
    pub bundle_id: &'a str,
    /// Expected App Store app id. Only bound in production.
    pub app_id: Option<u64>,
}

/// Verifies and decodes a signed transaction document.
///
/// Implementations must be stateless across calls; the App Store validator
/// may invoke one several times per request with different settings.
pub trait TransactionVerifier: Send + Sync {
    /// Verify `document` under `settings` and decode its payload.
    fn verify_and_decode(
        &self,
        settings: &VerifierSettings<'_>,
        document: &str,
    ) -> Result<TransactionPayload, VerificationStatus>;
}
