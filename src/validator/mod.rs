//! Per-platform license validators.
//!
//! Each validator is built once from its backend configuration and is
//! safe to share across threads. A validator whose backend is not
//! configured accepts every request.

pub mod app_store;
pub mod play_store;
pub mod steam;

use crate::LicensingError;

pub use app_store::AppStoreValidator;
pub use play_store::PlayStoreValidator;
pub use steam::SteamValidator;

/// Validation contract shared by every platform backend.
pub trait PlatformValidator: Send + Sync {
    /// License data this validator understands.
    type Data;

    /// Decide whether `data` proves a valid license.
    ///
    /// Malformed or unverifiable input is a `false` verdict, not an error.
    /// Errors are reserved for conditions the caller must not treat as
    /// a plain denial.
    fn validate(&self, data: &Self::Data) -> Result<bool, LicensingError>;
}
