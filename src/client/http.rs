//! Reqwest-based client for the Steamworks partner Web API.
//!
//! Both calls are plain GETs with a flat query string. Transport
//! failures, timeouts, non-success statuses and unparsable bodies all
//! come back as `PartnerApi` errors so the validator can fail closed.

use crate::protocol::steam::{
    parse_authenticate_response, parse_ownership_response, AuthenticateUserTicketRequest,
    AuthenticateUserTicketResponse, CheckAppOwnershipRequest, CheckAppOwnershipResponse,
};
use crate::LicensingError;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Serialize;
use std::time::Duration;

/// Production partner API base URL.
pub const PARTNER_API_BASE_URL: &str = "https://partner.steam-api.com";

/// Path of the ticket authentication endpoint.
pub const AUTHENTICATE_USER_TICKET_PATH: &str = "/ISteamUserAuth/AuthenticateUserTicket/v1";

/// Path of the ownership endpoint.
pub const CHECK_APP_OWNERSHIP_PATH: &str = "/ISteamUser/CheckAppOwnership/v2";

/// Server-side partner API operations the Steam validator relies on.
pub trait PartnerApi: Send + Sync {
    /// Resolve a session ticket to the SteamID that holds it.
    fn authenticate_user_ticket(
        &self,
        request: &AuthenticateUserTicketRequest,
    ) -> Result<AuthenticateUserTicketResponse, LicensingError>;

    /// Look up whether a SteamID owns an application.
    fn check_app_ownership(
        &self,
        request: &CheckAppOwnershipRequest,
    ) -> Result<CheckAppOwnershipResponse, LicensingError>;
}

/// Blocking partner API client.
pub struct SteamPartnerClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl SteamPartnerClient {
    /// Create a client against the production partner API.
    pub fn new(timeout: Duration) -> Result<Self, LicensingError> {
        Self::with_base_url(PARTNER_API_BASE_URL, timeout)
    }

    /// Create a client against a custom base URL (proxies, tests).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, LicensingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LicensingError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: build_user_agent(),
        })
    }

    /// Get the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Vec<u8>, LicensingError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| LicensingError::PartnerApi(format!("Request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LicensingError::PartnerApi(format!(
                "{} returned HTTP {}",
                path,
                status.as_u16()
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| LicensingError::PartnerApi(format!("Failed to read body: {}", e)))
    }
}

impl PartnerApi for SteamPartnerClient {
    fn authenticate_user_ticket(
        &self,
        request: &AuthenticateUserTicketRequest,
    ) -> Result<AuthenticateUserTicketResponse, LicensingError> {
        let body = self.get(AUTHENTICATE_USER_TICKET_PATH, request)?;
        parse_authenticate_response(&body)
    }

    fn check_app_ownership(
        &self,
        request: &CheckAppOwnershipRequest,
    ) -> Result<CheckAppOwnershipResponse, LicensingError> {
        let body = self.get(CHECK_APP_OWNERSHIP_PATH, request)?;
        parse_ownership_response(&body)
    }
}

/// Build the User-Agent string.
///
/// Format: `storewarden/<version>`
pub fn build_user_agent() -> String {
    format!("storewarden/{}", env!("CARGO_PKG_VERSION"))
}
