//! License validator - the main public API for Storewarden.
//!
//! The `LicenseValidator` owns one validator per platform and routes
//! each request to the validator matching its platform tag:
//! - `android` requests go to Google Play licensing
//! - `desktop` requests go to the Steam partner API
//! - `macos` requests go to App Store signed transactions

use crate::client::http::{PartnerApi, SteamPartnerClient};
use crate::clock::{Clock, SystemClock};
use crate::config::{BackendConfig, LicensingConfig};
use crate::crypto::receipt::X5cTransactionVerifier;
use crate::protocol::app_store::TransactionVerifier;
use crate::protocol::platform::{LicenseData, LicenseRequest, Platform};
use crate::validator::{AppStoreValidator, PlatformValidator, PlayStoreValidator, SteamValidator};
use crate::LicensingError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Main license validator for Storewarden.
///
/// Create one instance at startup and share it (for example behind an
/// `Arc`) across request handlers. All state is immutable after
/// construction.
pub struct LicenseValidator {
    play_store: PlayStoreValidator,
    steam: SteamValidator,
    app_store: AppStoreValidator,
}

impl LicenseValidator {
    /// Create a validator from raw configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - A credential tuple is only partially configured
    /// - The Play Console key cannot be decoded
    /// - The App Store root certificates cannot be read
    /// - HTTP client creation fails
    pub fn new(config: &LicensingConfig) -> Result<Self, LicensingError> {
        let backends = BackendConfig::from_config(config)?;
        Self::from_backends(backends, config.http_timeout)
    }

    /// Create a validator from the process environment.
    pub fn from_env() -> Result<Self, LicensingError> {
        Self::new(&LicensingConfig::from_env()?)
    }

    /// Create a validator from decoded backend configuration.
    pub fn from_backends(
        backends: BackendConfig,
        http_timeout: Duration,
    ) -> Result<Self, LicensingError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let partner: Option<Arc<dyn PartnerApi>> = match backends.steam {
            Some(_) => Some(Arc::new(SteamPartnerClient::new(http_timeout)?)),
            None => None,
        };
        let verifier: Arc<dyn TransactionVerifier> =
            Arc::new(X5cTransactionVerifier::with_clock(clock.clone()));

        Ok(Self::with_parts(backends, clock, partner, verifier))
    }

    /// Create a validator with injected clock, partner API and receipt
    /// verifier (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_parts(
        backends: BackendConfig,
        clock: Arc<dyn Clock>,
        partner: Arc<dyn PartnerApi>,
        verifier: Arc<dyn TransactionVerifier>,
    ) -> Self {
        Self::with_parts(backends, clock, Some(partner), verifier)
    }

    fn with_parts(
        backends: BackendConfig,
        clock: Arc<dyn Clock>,
        partner: Option<Arc<dyn PartnerApi>>,
        verifier: Arc<dyn TransactionVerifier>,
    ) -> Self {
        let play_store = PlayStoreValidator::with_clock(backends.play_store, clock);

        let steam = match (backends.steam, partner) {
            (Some(config), Some(api)) => SteamValidator::new(config, api),
            _ => SteamValidator::disabled(),
        };

        let app_store = match backends.app_store {
            Some(config) => AppStoreValidator::new(config, verifier),
            None => AppStoreValidator::disabled(),
        };

        Self::from_validators(play_store, steam, app_store)
    }

    /// Assemble a validator from individually built platform validators.
    pub fn from_validators(
        play_store: PlayStoreValidator,
        steam: SteamValidator,
        app_store: AppStoreValidator,
    ) -> Self {
        info!(
            play_store = play_store.is_enabled(),
            steam = steam.is_enabled(),
            app_store = app_store.is_enabled(),
            "License validator ready"
        );
        Self {
            play_store,
            steam,
            app_store,
        }
    }

    /// Whether the backend for `platform` is configured.
    pub fn is_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Android => self.play_store.is_enabled(),
            Platform::Desktop => self.steam.is_enabled(),
            Platform::MacOS => self.app_store.is_enabled(),
        }
    }

    /// Validate license data with the validator for its platform.
    ///
    /// # Errors
    /// - `VerificationExhausted` - App Store retries ran out without a verdict
    pub fn validate(&self, data: &LicenseData) -> Result<bool, LicensingError> {
        let platform = data.platform();
        let valid = match data {
            LicenseData::PlayStore(data) => self.play_store.validate(data)?,
            LicenseData::Steam(data) => self.steam.validate(data)?,
            LicenseData::AppStore(data) => self.app_store.validate(data)?,
        };
        debug!(%platform, valid, "License validated");
        Ok(valid)
    }

    /// Validate a raw inbound request.
    ///
    /// An absent or unrecognized platform selector denies the request
    /// without consulting any validator.
    pub fn validate_request(
        &self,
        selector: Option<&str>,
        request: &LicenseRequest,
    ) -> Result<bool, LicensingError> {
        match LicenseData::resolve(selector, request) {
            Ok(data) => self.validate(&data),
            Err(LicensingError::MissingPlatform(selector)) => {
                debug!(?selector, "License denied: unknown platform");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
