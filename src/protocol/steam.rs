//! Steamworks partner Web API request and response models.

use crate::LicensingError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identity string sent with every ticket authentication.
pub const TICKET_IDENTITY: &str = "licenseService";

/// Query parameters for `ISteamUserAuth/AuthenticateUserTicket/v1`.
#[derive(Clone, Serialize)]
pub struct AuthenticateUserTicketRequest {
    /// Publisher Web API key.
    pub key: String,
    /// Application the ticket was issued for.
    pub appid: u32,
    /// Hex-encoded session ticket.
    pub ticket: String,
    /// Identity the client passed when requesting the ticket.
    pub identity: String,
}

impl fmt::Debug for AuthenticateUserTicketRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateUserTicketRequest")
            .field("key", &"<redacted>")
            .field("appid", &self.appid)
            .field("ticket_len", &self.ticket.len())
            .field("identity", &self.identity)
            .finish()
    }
}

/// Ticket owner as reported by the partner API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticateUserTicketResponse {
    /// Result code, `"OK"` on success.
    pub result: String,
    /// SteamID of the ticket holder.
    #[serde(deserialize_with = "string_or_number")]
    pub steamid: String,
    /// SteamID of the license owner (differs under Family Sharing).
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub ownersteamid: Option<String>,
    /// VAC ban flag. Fetched but not consulted.
    #[serde(default)]
    pub vacbanned: bool,
    /// Publisher ban flag. Fetched but not consulted.
    #[serde(default)]
    pub publisherbanned: bool,
}

/// Query parameters for `ISteamUser/CheckAppOwnership/v2`.
#[derive(Clone, Serialize)]
pub struct CheckAppOwnershipRequest {
    /// Publisher Web API key.
    pub key: String,
    /// SteamID to check.
    pub steamid: String,
    /// Application to check.
    pub appid: u32,
}

impl fmt::Debug for CheckAppOwnershipRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckAppOwnershipRequest")
            .field("key", &"<redacted>")
            .field("steamid", &self.steamid)
            .field("appid", &self.appid)
            .finish()
    }
}

/// Ownership record for a SteamID and application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckAppOwnershipResponse {
    /// Whether the user owns the application.
    pub ownsapp: bool,
    /// Whether ownership is permanent (not a free weekend or similar).
    #[serde(default)]
    pub permanent: bool,
    /// Purchase time as reported by Steam.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// SteamID of the owner.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub ownersteamid: Option<String>,
    /// Whether the ownership comes from a site license.
    #[serde(default)]
    pub sitelicense: bool,
}

/// Error body returned by the partner API.
#[derive(Debug, Clone, Deserialize)]
pub struct PartnerApiError {
    /// Numeric error code.
    pub errorcode: i64,
    /// Human-readable description.
    #[serde(default)]
    pub errordesc: String,
}

#[derive(Debug, Deserialize)]
struct AuthenticateEnvelope {
    response: AuthenticateBody,
}

#[derive(Debug, Deserialize)]
struct AuthenticateBody {
    #[serde(default)]
    params: Option<AuthenticateUserTicketResponse>,
    #[serde(default)]
    error: Option<PartnerApiError>,
}

#[derive(Debug, Deserialize)]
struct OwnershipEnvelope {
    appownership: CheckAppOwnershipResponse,
}

/// Parse an `AuthenticateUserTicket` body.
pub fn parse_authenticate_response(
    body: &[u8],
) -> Result<AuthenticateUserTicketResponse, LicensingError> {
    let envelope: AuthenticateEnvelope = serde_json::from_slice(body).map_err(|e| {
        LicensingError::PartnerApi(format!("Failed to parse ticket response: {}", e))
    })?;

    match (envelope.response.params, envelope.response.error) {
        (Some(params), _) => Ok(params),
        (None, Some(error)) => Err(LicensingError::TicketRejected {
            errorcode: error.errorcode,
            errordesc: error.errordesc,
        }),
        (None, None) => Err(LicensingError::PartnerApi(
            "Ticket response has neither params nor error".to_string(),
        )),
    }
}

/// Parse a `CheckAppOwnership` body.
pub fn parse_ownership_response(body: &[u8]) -> Result<CheckAppOwnershipResponse, LicensingError> {
    serde_json::from_slice::<OwnershipEnvelope>(body)
        .map(|envelope| envelope.appownership)
        .map_err(|e| LicensingError::PartnerApi(format!("Failed to parse ownership response: {}", e)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

// SteamIDs arrive as strings from some endpoints and as numbers from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH_OK: &str = r#"{
        "response": {
            "params": {
                "result": "OK",
                "steamid": "76561197960287930",
                "ownersteamid": "76561197960287930",
                "vacbanned": false,
                "publisherbanned": false
            }
        }
    }"#;

    const AUTH_ERROR: &str = r#"{
        "response": {
            "error": {
                "errorcode": 101,
                "errordesc": "Invalid ticket"
            }
        }
    }"#;

    const OWNERSHIP_OK: &str = r#"{
        "appownership": {
            "ownsapp": true,
            "permanent": true,
            "timestamp": "2024-03-01T10:00:00Z",
            "ownersteamid": 76561197960287930,
            "sitelicense": false,
            "result": "OK"
        }
    }"#;

    #[test]
    fn test_parse_authenticate_ok() {
        let parsed = parse_authenticate_response(AUTH_OK.as_bytes()).unwrap();
        assert_eq!(parsed.result, "OK");
        assert_eq!(parsed.steamid, "76561197960287930");
        assert!(!parsed.vacbanned);
    }

    #[test]
    fn test_parse_authenticate_numeric_steamid() {
        let body = r#"{"response":{"params":{"result":"OK","steamid":76561197960287930}}}"#;
        let parsed = parse_authenticate_response(body.as_bytes()).unwrap();
        assert_eq!(parsed.steamid, "76561197960287930");
        assert_eq!(parsed.ownersteamid, None);
    }

    #[test]
    fn test_parse_authenticate_error_body() {
        let err = parse_authenticate_response(AUTH_ERROR.as_bytes()).unwrap_err();
        match err {
            LicensingError::TicketRejected {
                errorcode,
                errordesc,
            } => {
                assert_eq!(errorcode, 101);
                assert_eq!(errordesc, "Invalid ticket");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_authenticate_garbage() {
        let result = parse_authenticate_response(b"<html>502</html>");
        assert!(matches!(result, Err(LicensingError::PartnerApi(_))));
    }

    #[test]
    fn test_parse_authenticate_empty_response() {
        let result = parse_authenticate_response(br#"{"response":{}}"#);
        assert!(matches!(result, Err(LicensingError::PartnerApi(_))));
    }

    #[test]
    fn test_parse_ownership_ok() {
        let parsed = parse_ownership_response(OWNERSHIP_OK.as_bytes()).unwrap();
        assert!(parsed.ownsapp);
        assert!(parsed.permanent);
        assert_eq!(parsed.ownersteamid.as_deref(), Some("76561197960287930"));
    }

    #[test]
    fn test_parse_ownership_missing_flag() {
        let result = parse_ownership_response(br#"{"appownership":{"permanent":true}}"#);
        assert!(matches!(result, Err(LicensingError::PartnerApi(_))));
    }

    #[test]
    fn test_request_debug_redacts_key() {
        let request = CheckAppOwnershipRequest {
            key: "super-secret".to_string(),
            steamid: "1".to_string(),
            appid: 480,
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("480"));
    }
}
