//! Platform selection and per-request license data.
//!
//! The HTTP layer hands over a platform selector (usually a request
//! header) and the raw form fields. [`LicenseData::resolve`] turns them
//! into exactly one tagged variant, which the license validator then
//! dispatches on.

use crate::LicensingError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::fmt;

/// Distribution platform the caller claims to be running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Google Play licensing response.
    Android,
    /// Steam session ticket.
    Desktop,
    /// App Store signed transaction.
    MacOS,
}

impl Platform {
    /// Parse a platform selector. Unknown selectors yield `None`, never a default.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "android" => Some(Self::Android),
            "desktop" => Some(Self::Desktop),
            "macos" => Some(Self::MacOS),
            _ => None,
        }
    }

    /// Selector string for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Desktop => "desktop",
            Self::MacOS => "macos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw license fields as submitted with a request.
///
/// Every field is optional; which ones matter depends on the platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseRequest {
    /// Play Store licensing response data (pipe-delimited).
    #[serde(rename = "responseData", default)]
    pub signed_data: Option<String>,

    /// Base64 signature over `signed_data`.
    #[serde(default)]
    pub signature: Option<String>,

    /// Base64-encoded Steam session ticket.
    #[serde(rename = "ticket", default)]
    pub auth_ticket: Option<String>,

    /// App Store signed transaction (compact JWS).
    #[serde(rename = "signedTransaction", default)]
    pub transaction: Option<String>,
}

/// Play Store proof of entitlement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayStoreLicenseData {
    /// Pipe-delimited signed response, kept byte-for-byte.
    pub signed_data: Option<String>,
    /// Base64 detached signature.
    pub signature: Option<String>,
}

/// Steam proof of entitlement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SteamLicenseData {
    /// Decoded session ticket. `None` when absent or not valid base64.
    pub auth_ticket: Option<Vec<u8>>,
}

/// App Store proof of entitlement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppStoreLicenseData {
    /// Compact JWS signed transaction.
    pub transaction: Option<String>,
}

/// License data for one request, exactly one variant per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseData {
    /// Android / Google Play.
    PlayStore(PlayStoreLicenseData),
    /// Desktop / Steam.
    Steam(SteamLicenseData),
    /// macOS / App Store.
    AppStore(AppStoreLicenseData),
}

impl LicenseData {
    /// Build license data for a platform from raw request fields.
    pub fn from_request(platform: Platform, request: &LicenseRequest) -> Self {
        match platform {
            Platform::Android => Self::PlayStore(PlayStoreLicenseData {
                signed_data: request.signed_data.clone(),
                signature: request.signature.clone(),
            }),
            Platform::Desktop => Self::Steam(SteamLicenseData {
                auth_ticket: request
                    .auth_ticket
                    .as_deref()
                    .and_then(|ticket| STANDARD.decode(ticket).ok()),
            }),
            Platform::MacOS => Self::AppStore(AppStoreLicenseData {
                transaction: request.transaction.clone(),
            }),
        }
    }

    /// Resolve a platform selector and raw fields into license data.
    ///
    /// # Errors
    /// * `MissingPlatform` - selector absent or not one of the known platforms
    pub fn resolve(
        selector: Option<&str>,
        request: &LicenseRequest,
    ) -> Result<Self, LicensingError> {
        let platform = selector
            .and_then(Platform::parse)
            .ok_or_else(|| LicensingError::MissingPlatform(selector.map(String::from)))?;
        Ok(Self::from_request(platform, request))
    }

    /// Platform this data belongs to.
    pub fn platform(&self) -> Platform {
        match self {
            Self::PlayStore(_) => Platform::Android,
            Self::Steam(_) => Platform::Desktop,
            Self::AppStore(_) => Platform::MacOS,
        }
    }
}
