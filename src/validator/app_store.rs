//! App Store signed transaction validation.
//!
//! A transaction is tried in production first and falls back to sandbox
//! when production rejects the app identifier. Within an environment an
//! online attempt that fails with a retryable status is repeated once
//! offline. The walk is modelled as an explicit state machine so the
//! number of verifier calls is bounded.

use crate::config::AppStoreConfig;
use crate::crypto::digest::fingerprint;
use crate::protocol::app_store::{
    Environment, TransactionPayload, TransactionVerifier, VerificationStatus, VerifierSettings,
};
use crate::protocol::platform::AppStoreLicenseData;
use crate::validator::PlatformValidator;
use crate::LicensingError;
use std::sync::Arc;
use tracing::{debug, info};

/// Upper bound on verifier calls for one transaction.
pub const MAX_ATTEMPTS: usize = 4;

/// Position in the environment/online fallback walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Production, with online checks.
    TryProdOnline,
    /// Production, offline.
    TryProdOffline,
    /// Sandbox, with online checks.
    TrySandboxOnline,
    /// Sandbox, offline.
    TrySandboxOffline,
    /// Verification succeeded.
    Succeeded,
    /// Verification failed with a final status.
    Denied(VerificationStatus),
}

impl AttemptState {
    /// Environment and online flag for the next verifier call, or `None`
    /// once the walk has reached a verdict.
    pub fn attempt(&self) -> Option<(Environment, bool)> {
        match self {
            Self::TryProdOnline => Some((Environment::Production, true)),
            Self::TryProdOffline => Some((Environment::Production, false)),
            Self::TrySandboxOnline => Some((Environment::Sandbox, true)),
            Self::TrySandboxOffline => Some((Environment::Sandbox, false)),
            Self::Succeeded | Self::Denied(_) => None,
        }
    }

    /// Whether the walk has reached a verdict.
    pub fn is_terminal(&self) -> bool {
        self.attempt().is_none()
    }

    /// Move to the next state given the outcome of the current attempt.
    ///
    /// Terminal states stay where they are.
    ///
    /// # Errors
    /// * `VerificationExhausted` - an offline attempt came back retryable
    pub fn advance(self, outcome: Result<(), VerificationStatus>) -> Result<Self, LicensingError> {
        if self.is_terminal() {
            return Ok(self);
        }

        let status = match outcome {
            Ok(()) => return Ok(Self::Succeeded),
            Err(status) => status,
        };

        let next = match (self, status) {
            (Self::TryProdOnline, VerificationStatus::RetryableVerificationFailure) => {
                Self::TryProdOffline
            }
            (Self::TrySandboxOnline, VerificationStatus::RetryableVerificationFailure) => {
                Self::TrySandboxOffline
            }
            (
                Self::TryProdOffline | Self::TrySandboxOffline,
                VerificationStatus::RetryableVerificationFailure,
            ) => return Err(LicensingError::VerificationExhausted),
            (
                Self::TryProdOnline | Self::TryProdOffline,
                VerificationStatus::InvalidAppIdentifier,
            ) => Self::TrySandboxOnline,
            (_, status) => Self::Denied(status),
        };
        Ok(next)
    }
}

/// Validator for App Store signed transactions.
pub struct AppStoreValidator {
    backend: Option<(AppStoreConfig, Arc<dyn TransactionVerifier>)>,
}

impl AppStoreValidator {
    /// Create an enabled validator using `verifier`.
    pub fn new(config: AppStoreConfig, verifier: Arc<dyn TransactionVerifier>) -> Self {
        Self {
            backend: Some((config, verifier)),
        }
    }

    /// Create a validator that accepts every request.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Whether App Store verification is active.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Run the fallback walk for one document.
    ///
    /// # Errors
    /// * `ReceiptVerification` - the walk ended in a denial
    /// * `VerificationExhausted` - retries ran out without a verdict
    /// * `ConfigError` - the validator is disabled
    pub fn verify_transaction(&self, document: &str) -> Result<TransactionPayload, LicensingError> {
        let (config, verifier) = self.backend.as_ref().ok_or_else(|| {
            LicensingError::ConfigError("App Store validation is not configured".to_string())
        })?;

        let document_fp = fingerprint(document.as_bytes());
        let mut state = AttemptState::TryProdOnline;
        let mut payload = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let Some((environment, online)) = state.attempt() else {
                break;
            };

            let settings = VerifierSettings {
                root_certificates: &config.root_certificates,
                online,
                environment,
                bundle_id: &config.bundle_id,
                app_id: match environment {
                    Environment::Production => Some(config.app_id),
                    Environment::Sandbox => None,
                },
            };

            let outcome = match verifier.verify_and_decode(&settings, document) {
                Ok(decoded) => {
                    payload = Some(decoded);
                    Ok(())
                }
                Err(status) => {
                    debug!(
                        attempt,
                        %environment,
                        online,
                        %status,
                        transaction = %document_fp,
                        "App Store verification attempt failed"
                    );
                    Err(status)
                }
            };

            state = state.advance(outcome)?;
        }

        match (state, payload) {
            (AttemptState::Succeeded, Some(payload)) => Ok(payload),
            (AttemptState::Denied(status), _) => Err(LicensingError::ReceiptVerification(status)),
            _ => Err(LicensingError::VerificationExhausted),
        }
    }
}

impl PlatformValidator for AppStoreValidator {
    type Data = AppStoreLicenseData;

    fn validate(&self, data: &AppStoreLicenseData) -> Result<bool, LicensingError> {
        if !self.is_enabled() {
            return Ok(true);
        }

        let Some(document) = data.transaction.as_deref() else {
            debug!("App Store license denied: no signed transaction");
            return Ok(false);
        };

        match self.verify_transaction(document) {
            Ok(payload) => {
                info!(
                    transaction_id = payload.transaction_id.as_deref().unwrap_or("-"),
                    product_id = payload.product_id.as_deref().unwrap_or("-"),
                    environment = payload.environment.as_deref().unwrap_or("-"),
                    "App Store transaction verified"
                );
                Ok(true)
            }
            Err(LicensingError::ReceiptVerification(status)) => {
                info!(
                    %status,
                    transaction = %fingerprint(document.as_bytes()),
                    "App Store license denied"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::protocol::app_store::VerificationStatus::*;

    /// Verifier that replays scripted outcomes and records each call.
    struct ScriptedVerifier {
        outcomes: Mutex<VecDeque<Result<TransactionPayload, VerificationStatus>>>,
        calls: Mutex<Vec<(Environment, bool, Option<u64>)>>,
    }

    impl ScriptedVerifier {
        fn new(outcomes: Vec<Result<TransactionPayload, VerificationStatus>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Environment, bool, Option<u64>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TransactionVerifier for ScriptedVerifier {
        fn verify_and_decode(
            &self,
            settings: &VerifierSettings<'_>,
            _document: &str,
        ) -> Result<TransactionPayload, VerificationStatus> {
            self.calls
                .lock()
                .unwrap()
                .push((settings.environment, settings.online, settings.app_id));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(VerificationFailure))
        }
    }

    fn config() -> AppStoreConfig {
        AppStoreConfig {
            app_id: 1234567890,
            bundle_id: "com.example.app".to_string(),
            root_certificates: vec![b"root".to_vec()],
        }
    }

    fn payload() -> TransactionPayload {
        TransactionPayload {
            transaction_id: Some("2000000000000001".to_string()),
            bundle_id: Some("com.example.app".to_string()),
            ..Default::default()
        }
    }

    fn document() -> AppStoreLicenseData {
        AppStoreLicenseData {
            transaction: Some("header.payload.signature".to_string()),
        }
    }

    #[test]
    fn test_advance_success_from_any_attempt() {
        for state in [
            AttemptState::TryProdOnline,
            AttemptState::TryProdOffline,
            AttemptState::TrySandboxOnline,
            AttemptState::TrySandboxOffline,
        ] {
            assert_eq!(state.advance(Ok(())).unwrap(), AttemptState::Succeeded);
        }
    }

    #[test]
    fn test_advance_retryable_goes_offline() {
        assert_eq!(
            AttemptState::TryProdOnline
                .advance(Err(RetryableVerificationFailure))
                .unwrap(),
            AttemptState::TryProdOffline
        );
        assert_eq!(
            AttemptState::TrySandboxOnline
                .advance(Err(RetryableVerificationFailure))
                .unwrap(),
            AttemptState::TrySandboxOffline
        );
    }

    #[test]
    fn test_advance_offline_retryable_is_exhausted() {
        for state in [AttemptState::TryProdOffline, AttemptState::TrySandboxOffline] {
            assert!(matches!(
                state.advance(Err(RetryableVerificationFailure)),
                Err(LicensingError::VerificationExhausted)
            ));
        }
    }

    #[test]
    fn test_advance_invalid_app_identifier() {
        assert_eq!(
            AttemptState::TryProdOnline
                .advance(Err(InvalidAppIdentifier))
                .unwrap(),
            AttemptState::TrySandboxOnline
        );
        assert_eq!(
            AttemptState::TryProdOffline
                .advance(Err(InvalidAppIdentifier))
                .unwrap(),
            AttemptState::TrySandboxOnline
        );
        assert_eq!(
            AttemptState::TrySandboxOnline
                .advance(Err(InvalidAppIdentifier))
                .unwrap(),
            AttemptState::Denied(InvalidAppIdentifier)
        );
    }

    #[test]
    fn test_advance_other_status_denies() {
        for status in [
            VerificationFailure,
            InvalidEnvironment,
            InvalidChainLength,
            InvalidCertificate,
            Failure,
        ] {
            assert_eq!(
                AttemptState::TryProdOnline.advance(Err(status)).unwrap(),
                AttemptState::Denied(status)
            );
        }
    }

    #[test]
    fn test_advance_terminal_is_sticky() {
        assert_eq!(
            AttemptState::Succeeded.advance(Err(Failure)).unwrap(),
            AttemptState::Succeeded
        );
        assert_eq!(
            AttemptState::Denied(Failure).advance(Ok(())).unwrap(),
            AttemptState::Denied(Failure)
        );
    }

    #[test]
    fn test_disabled_accepts_anything() {
        let v = AppStoreValidator::disabled();
        assert!(!v.is_enabled());
        assert!(v.validate(&AppStoreLicenseData::default()).unwrap());
    }

    #[test]
    fn test_missing_document_is_denied_without_calls() {
        let verifier = ScriptedVerifier::new(vec![Ok(payload())]);
        let v = AppStoreValidator::new(config(), verifier.clone());
        assert!(!v.validate(&AppStoreLicenseData::default()).unwrap());
        assert!(verifier.calls().is_empty());
    }

    #[test]
    fn test_production_success() {
        let verifier = ScriptedVerifier::new(vec![Ok(payload())]);
        let v = AppStoreValidator::new(config(), verifier.clone());
        assert!(v.validate(&document()).unwrap());
        assert_eq!(
            verifier.calls(),
            vec![(Environment::Production, true, Some(1234567890))]
        );
    }

    #[test]
    fn test_sandbox_fallback_on_invalid_app_identifier() {
        let verifier = ScriptedVerifier::new(vec![Err(InvalidAppIdentifier), Ok(payload())]);
        let v = AppStoreValidator::new(config(), verifier.clone());
        assert!(v.validate(&document()).unwrap());
        assert_eq!(
            verifier.calls(),
            vec![
                (Environment::Production, true, Some(1234567890)),
                (Environment::Sandbox, true, None),
            ]
        );
    }

    #[test]
    fn test_retryable_then_final_failure() {
        let verifier =
            ScriptedVerifier::new(vec![Err(RetryableVerificationFailure), Err(InvalidCertificate)]);
        let v = AppStoreValidator::new(config(), verifier.clone());
        assert!(!v.validate(&document()).unwrap());
        assert_eq!(
            verifier.calls(),
            vec![
                (Environment::Production, true, Some(1234567890)),
                (Environment::Production, false, Some(1234567890)),
            ]
        );
    }

    #[test]
    fn test_offline_retryable_is_exhausted() {
        let verifier = ScriptedVerifier::new(vec![
            Err(RetryableVerificationFailure),
            Err(RetryableVerificationFailure),
        ]);
        let v = AppStoreValidator::new(config(), verifier);
        assert!(matches!(
            v.validate(&document()),
            Err(LicensingError::VerificationExhausted)
        ));
    }

    #[test]
    fn test_longest_walk_uses_every_attempt() {
        let verifier = ScriptedVerifier::new(vec![
            Err(RetryableVerificationFailure),
            Err(InvalidAppIdentifier),
            Err(RetryableVerificationFailure),
            Ok(payload()),
        ]);
        let v = AppStoreValidator::new(config(), verifier.clone());
        assert!(v.validate(&document()).unwrap());
        assert_eq!(verifier.calls().len(), MAX_ATTEMPTS);
    }

    #[test]
    fn test_verify_transaction_reports_denial_status() {
        let verifier = ScriptedVerifier::new(vec![Err(InvalidEnvironment)]);
        let v = AppStoreValidator::new(config(), verifier);
        assert!(matches!(
            v.verify_transaction("header.payload.signature"),
            Err(LicensingError::ReceiptVerification(InvalidEnvironment))
        ));
    }

    #[test]
    fn test_verify_transaction_disabled() {
        let v = AppStoreValidator::disabled();
        assert!(matches!(
            v.verify_transaction("a.b.c"),
            Err(LicensingError::ConfigError(_))
        ));
    }
}
