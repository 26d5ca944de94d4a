//! # Storewarden
//!
//! **Fail-closed store entitlement validation for Rust services.**
//!
//! Storewarden answers one question for a backend: does this request carry
//! valid proof that the user is entitled to the product on their platform?
//!
//! ## Platforms
//!
//! - **Google Play** (`android`): RSA/SHA-1 signed licensing responses,
//!   accepted for 6 hours after they were issued
//! - **Steam** (`desktop`): session tickets resolved through the partner
//!   Web API, followed by an ownership check
//! - **App Store** (`macos`): signed transaction documents verified against
//!   trusted roots, with sandbox and offline fallback
//!
//! A platform whose credentials are not configured accepts every request.
//! A configured platform denies anything it cannot positively verify.
//!
//! ## Quickstart
//!
//! ```no_run
//! use storewarden::{LicenseRequest, LicenseValidator, LicensingConfig};
//!
//! fn main() -> Result<(), storewarden::LicensingError> {
//!     let config = LicensingConfig::from_env()?;
//!     let validator = LicenseValidator::new(&config)?;
//!
//!     let request = LicenseRequest {
//!         auth_ticket: Some("FAAAAA==".to_string()),
//!         ..Default::default()
//!     };
//!
//!     if validator.validate_request(Some("desktop"), &request)? {
//!         println!("Entitled");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! - `PLAY_CONSOLE_PUB_KEY` - base64 DER Play Console licensing key
//! - `STEAMWORKS_PUBLISHER_WEB_API_KEY` and `STEAM_APP_ID` - both or neither
//! - `APP_STORE_APP_ID`, `APP_STORE_BUNDLE_ID` and `APP_STORE_ROOT_CERTS_DIR` -
//!   all or none
//! - `LICENSING_HTTP_TIMEOUT_SECS` - partner API timeout (default 30)
//!
//! See [`LicensingConfig`] for full documentation.
//!
//! ## Threat Model
//!
//! Storewarden protects against forged Play responses (signature mismatch),
//! replayed Play responses (6 hour window), tickets for other apps or
//! unowned apps, and transaction documents not chained to a trusted root.
//!
//! Storewarden does **not** cache verdicts, track users across requests,
//! or check revocation of App Store certificates.

#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/storewarden/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Validator layer
pub mod validator;

// Manager (main public API)
pub mod manager;

// Optional integrations
pub mod integrations;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::{BackendConfig, LicensingConfig};
pub use errors::LicensingError;
pub use integrations::tokio::AsyncLicenseValidator;
pub use manager::LicenseValidator;
pub use protocol::app_store::{Environment, TransactionPayload, TransactionVerifier, VerificationStatus};
pub use protocol::platform::{LicenseData, LicenseRequest, Platform};
pub use validator::PlatformValidator;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
