//! Validate one license request from the command line.
//!
//! Backends are configured from the environment (see `LicensingConfig`);
//! any backend left unconfigured accepts every request.
//!
//! # Running
//!
//! ```bash
//! export STEAMWORKS_PUBLISHER_WEB_API_KEY="your-publisher-key"
//! export STEAM_APP_ID="480"
//! cargo run --example validate_request -- desktop "$(base64 -w0 ticket.bin)"
//! ```
//!
//! The second argument is the platform's proof: a base64 session ticket
//! for `desktop`, a signed transaction for `macos`, or
//! `<responseData> <signature>` for `android`.

use storewarden::{LicenseRequest, LicenseValidator, LicensingConfig, LicensingError};

fn main() -> Result<(), LicensingError> {
    let mut args = std::env::args().skip(1);
    let platform = args.next();
    let proof = args.next();

    let mut request = LicenseRequest::default();
    match platform.as_deref() {
        Some("android") => {
            request.signed_data = proof;
            request.signature = args.next();
        }
        Some("desktop") => request.auth_ticket = proof,
        Some("macos") => request.transaction = proof,
        _ => {}
    }

    let config = LicensingConfig::from_env()?;
    let validator = LicenseValidator::new(&config)?;

    match validator.validate_request(platform.as_deref(), &request) {
        Ok(true) => println!("Entitled"),
        Ok(false) => println!("Not entitled"),
        Err(LicensingError::VerificationExhausted) => {
            eprintln!("App Store verification could not reach a verdict; retry later");
            std::process::exit(2);
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
