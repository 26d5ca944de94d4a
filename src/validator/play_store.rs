//! Google Play licensing response validation.
//!
//! Pipeline, failing closed at every step:
//! 1. Bypass when no Play Console key is configured
//! 2. Parse the signed response grammar
//! 3. Reject responses older than the 6 hour validity window
//! 4. Reject any status other than `LICENSED`, or a missing signature
//! 5. Verify the RSA/SHA-1 signature over the exact signed bytes

use crate::clock::{Clock, SystemClock};
use crate::config::PlayStoreConfig;
use crate::crypto::digest::fingerprint;
use crate::crypto::freshness::{age_millis, is_fresh};
use crate::crypto::verify::verify_pkcs1v15_sha1;
use crate::protocol::platform::PlayStoreLicenseData;
use crate::protocol::play_store::{LicensingStatus, SignedLicenseResponse};
use crate::validator::PlatformValidator;
use crate::LicensingError;
use std::sync::Arc;
use tracing::debug;

/// Validator for Play licensing responses.
pub struct PlayStoreValidator {
    config: Option<PlayStoreConfig>,
    clock: Arc<dyn Clock>,
}

impl PlayStoreValidator {
    /// Create a validator. `None` disables Play Store checks.
    pub fn new(config: Option<PlayStoreConfig>) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a validator on a custom clock.
    pub fn with_clock(config: Option<PlayStoreConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Whether Play Store verification is active.
    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    fn check(&self, config: &PlayStoreConfig, data: &PlayStoreLicenseData) -> bool {
        let Some(signed_data) = data.signed_data.as_deref() else {
            debug!("Play Store license denied: no signed data");
            return false;
        };

        let response = match SignedLicenseResponse::parse(signed_data) {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Play Store license denied: unreadable signed data");
                return false;
            }
        };

        if !is_fresh(response.timestamp_millis, self.clock.as_ref()) {
            debug!(
                age_ms = age_millis(response.timestamp_millis, self.clock.as_ref()),
                "Play Store license denied: response outside validity window"
            );
            return false;
        }

        if response.status != LicensingStatus::Licensed {
            debug!(status = ?response.status, "Play Store license denied: not licensed");
            return false;
        }

        let Some(signature) = data.signature.as_deref() else {
            debug!("Play Store license denied: no signature");
            return false;
        };

        match verify_pkcs1v15_sha1(&config.public_key, signature, signed_data.as_bytes()) {
            Ok(()) => {
                debug!(
                    package = response.package_name,
                    response = %fingerprint(signed_data.as_bytes()),
                    "Play Store license verified"
                );
                true
            }
            Err(e) => {
                debug!(
                    error = %e,
                    response = %fingerprint(signed_data.as_bytes()),
                    "Play Store license denied: signature check failed"
                );
                false
            }
        }
    }
}

impl PlatformValidator for PlayStoreValidator {
    type Data = PlayStoreLicenseData;

    fn validate(&self, data: &PlayStoreLicenseData) -> Result<bool, LicensingError> {
        match &self.config {
            Some(config) => Ok(self.check(config, data)),
            None => Ok(true),
        }
    }
}
