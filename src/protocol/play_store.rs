//! Google Play licensing response grammar.
//!
//! The signed response is a fixed-arity, pipe-delimited record:
//!
//! ```text
//! <status>|<nonce>|<package>|<versionCode>|<userId>|<timestampMillis>:<extras>
//! ```
//!
//! At least six fields must be present. Field 5 splits on its first `:`;
//! only the integer prefix (the response timestamp) is consumed.

use thiserror::Error;

/// Minimum number of pipe-separated fields in a signed response.
pub const MIN_FIELDS: usize = 6;

/// Response code reported by the Play licensing server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LicensingStatus {
    /// User holds a valid license.
    Licensed,
    /// User does not hold a license.
    NotLicensed,
    /// Licensed, but signed with a retired key.
    LicensedOldKey,
    /// Application is not managed by the store.
    ErrorNotMarketManaged,
    /// Licensing server failed.
    ErrorServerFailure,
    /// Caller exceeded its quota.
    ErrorOverQuota,
    /// Device could not reach the licensing server.
    ErrorContactingServer,
    /// Package name unknown to the store.
    ErrorInvalidPackageName,
    /// Requesting UID does not own the package.
    ErrorNonMatchingUid,
    /// Anything unparsable or outside the known set.
    Unknown,
}

impl LicensingStatus {
    /// Map a raw response code onto the closed status set.
    pub fn from_code(code: i64) -> Self {
        match code {
            0x0 => Self::Licensed,
            0x1 => Self::NotLicensed,
            0x2 => Self::LicensedOldKey,
            0x3 => Self::ErrorNotMarketManaged,
            0x4 => Self::ErrorServerFailure,
            0x5 => Self::ErrorOverQuota,
            0x101 => Self::ErrorContactingServer,
            0x102 => Self::ErrorInvalidPackageName,
            0x103 => Self::ErrorNonMatchingUid,
            _ => Self::Unknown,
        }
    }

    /// Parse the status field. Non-numeric input maps to `Unknown`.
    pub fn parse(field: &str) -> Self {
        field
            .parse::<i64>()
            .map(Self::from_code)
            .unwrap_or(Self::Unknown)
    }
}

/// Failure to read the signed response grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignedDataError {
    /// Fewer than [`MIN_FIELDS`] pipe-separated fields.
    #[error("expected at least 6 fields, got {0}")]
    TooFewFields(usize),

    /// Field 5 does not start with an integer timestamp.
    #[error("malformed response timestamp: {0:?}")]
    BadTimestamp(String),
}

/// The fields of a signed response that validation consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedLicenseResponse<'a> {
    /// Field 0.
    pub status: LicensingStatus,
    /// Field 2. Parsed but not compared against any expected package.
    pub package_name: &'a str,
    /// Integer prefix of field 5, Unix milliseconds.
    pub timestamp_millis: i64,
}

impl<'a> SignedLicenseResponse<'a> {
    /// Parse a signed response without touching its signature.
    pub fn parse(signed_data: &'a str) -> Result<Self, SignedDataError> {
        let fields: Vec<&str> = signed_data.split('|').collect();
        if fields.len() < MIN_FIELDS {
            return Err(SignedDataError::TooFewFields(fields.len()));
        }

        let status = LicensingStatus::parse(fields[0]);
        let package_name = fields[2];

        let raw_timestamp = fields[5].split(':').next().unwrap_or_default();
        let timestamp_millis = raw_timestamp
            .parse::<i64>()
            .map_err(|_| SignedDataError::BadTimestamp(raw_timestamp.to_string()))?;

        Ok(Self {
            status,
            package_name,
            timestamp_millis,
        })
    }
}
