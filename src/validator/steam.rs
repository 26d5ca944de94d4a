//! Steam session ticket validation.
//!
//! The ticket is authenticated against the partner API to learn which
//! SteamID holds it, then ownership of the configured app is checked for
//! that SteamID. Any partner API failure denies the license.

use crate::client::http::PartnerApi;
use crate::config::SteamConfig;
use crate::crypto::digest::fingerprint;
use crate::protocol::platform::SteamLicenseData;
use crate::protocol::steam::{
    AuthenticateUserTicketRequest, CheckAppOwnershipRequest, TICKET_IDENTITY,
};
use crate::validator::PlatformValidator;
use crate::LicensingError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Validator for Steam session tickets.
pub struct SteamValidator {
    backend: Option<(SteamConfig, Arc<dyn PartnerApi>)>,
}

impl SteamValidator {
    /// Create an enabled validator talking to `api`.
    pub fn new(config: SteamConfig, api: Arc<dyn PartnerApi>) -> Self {
        Self {
            backend: Some((config, api)),
        }
    }

    /// Create a validator that accepts every request.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Whether Steam verification is active.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    fn check(&self, config: &SteamConfig, api: &dyn PartnerApi, ticket: &[u8]) -> bool {
        let ticket_fp = fingerprint(ticket);

        let auth_request = AuthenticateUserTicketRequest {
            key: config.web_api_key.clone(),
            appid: config.app_id,
            ticket: hex::encode(ticket),
            identity: TICKET_IDENTITY.to_string(),
        };

        let owner = match api.authenticate_user_ticket(&auth_request) {
            Ok(owner) => owner,
            Err(LicensingError::TicketRejected {
                errorcode,
                errordesc,
            }) => {
                debug!(
                    errorcode,
                    errordesc = %errordesc,
                    ticket = %ticket_fp,
                    "Steam license denied: ticket rejected"
                );
                return false;
            }
            Err(e) => {
                warn!(error = %e, ticket = %ticket_fp, "Steam ticket authentication failed");
                return false;
            }
        };

        let ownership_request = CheckAppOwnershipRequest {
            key: config.web_api_key.clone(),
            steamid: owner.steamid.clone(),
            appid: config.app_id,
        };

        match api.check_app_ownership(&ownership_request) {
            Ok(ownership) if ownership.ownsapp => {
                debug!(
                    steamid = %owner.steamid,
                    app_id = config.app_id,
                    permanent = ownership.permanent,
                    "Steam ownership verified"
                );
                true
            }
            Ok(_) => {
                debug!(
                    steamid = %owner.steamid,
                    app_id = config.app_id,
                    "Steam license denied: app not owned"
                );
                false
            }
            Err(e) => {
                warn!(
                    error = %e,
                    steamid = %owner.steamid,
                    "Steam ownership check failed"
                );
                false
            }
        }
    }
}

impl PlatformValidator for SteamValidator {
    type Data = SteamLicenseData;

    fn validate(&self, data: &SteamLicenseData) -> Result<bool, LicensingError> {
        let Some((config, api)) = &self.backend else {
            return Ok(true);
        };

        match data.auth_ticket.as_deref() {
            Some(ticket) => Ok(self.check(config, api.as_ref(), ticket)),
            None => {
                debug!("Steam license denied: no usable ticket");
                Ok(false)
            }
        }
    }
}
