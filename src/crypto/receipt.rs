//! App Store signed transaction (JWS + x5c chain) verification.
//!
//! A signed transaction is a compact JWS whose header carries the full
//! certificate chain `[leaf, intermediate, root]`. Verification order:
//! 1. Split and decode the three JWS segments
//! 2. Require `ES256` and a three-certificate chain
//! 3. Pin the chain root against the configured trust bundle
//! 4. Check validity periods, issuer signatures and Apple marker extensions
//! 5. Verify the ES256 signature with the leaf key
//! 6. Match bundle id and environment against the verifier settings

use crate::clock::{Clock, SystemClock};
use crate::protocol::app_store::{
    TransactionPayload, TransactionVerifier, VerificationStatus, VerifierSettings,
};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use serde::Deserialize;
use std::sync::Arc;
use x509_parser::certificate::X509Certificate;
use x509_parser::parse_x509_certificate;
use x509_parser::time::ASN1Time;

/// Extension present on App Store receipt signing (leaf) certificates.
pub const LEAF_MARKER_OID: &str = "1.2.840.113635.100.6.11.1";

/// Extension present on the WWDR intermediate certificate.
pub const INTERMEDIATE_MARKER_OID: &str = "1.2.840.113635.100.6.2.1";

/// Number of certificates in a signed transaction chain.
pub const CHAIN_LENGTH: usize = 3;

#[derive(Debug, Deserialize)]
struct JwsHeader {
    alg: String,
    #[serde(default)]
    x5c: Vec<String>,
}

/// Built-in verifier for App Store signed transactions.
///
/// Online mode checks certificate validity at the current time; offline
/// mode checks it at the payload's `signedDate`. No revocation lookup is
/// made, so this verifier never reports
/// [`VerificationStatus::RetryableVerificationFailure`].
pub struct X5cTransactionVerifier {
    clock: Arc<dyn Clock>,
}

impl X5cTransactionVerifier {
    /// Create a verifier on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a verifier on a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn effective_time(
        &self,
        online: bool,
        payload: &TransactionPayload,
    ) -> Result<ASN1Time, VerificationStatus> {
        let seconds = if online {
            self.clock.now_utc().timestamp()
        } else {
            payload
                .signed_date
                .map(|millis| millis / 1000)
                .ok_or(VerificationStatus::VerificationFailure)?
        };
        ASN1Time::from_timestamp(seconds).map_err(|_| VerificationStatus::VerificationFailure)
    }
}

impl Default for X5cTransactionVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionVerifier for X5cTransactionVerifier {
    fn verify_and_decode(
        &self,
        settings: &VerifierSettings<'_>,
        document: &str,
    ) -> Result<TransactionPayload, VerificationStatus> {
        let mut segments = document.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VerificationStatus::VerificationFailure);
        };

        let header: JwsHeader = decode_segment(header_b64)?;
        if header.alg != "ES256" {
            return Err(VerificationStatus::VerificationFailure);
        }
        if header.x5c.len() != CHAIN_LENGTH {
            return Err(VerificationStatus::InvalidChainLength);
        }

        let payload: TransactionPayload = decode_segment(payload_b64)?;

        let chain_der = header
            .x5c
            .iter()
            .map(|cert| STANDARD.decode(cert))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VerificationStatus::InvalidCertificate)?;

        if !settings
            .root_certificates
            .iter()
            .any(|root| root == &chain_der[2])
        {
            return Err(VerificationStatus::VerificationFailure);
        }

        let leaf = parse_certificate(&chain_der[0])?;
        let intermediate = parse_certificate(&chain_der[1])?;
        let root = parse_certificate(&chain_der[2])?;

        let at = self.effective_time(settings.online, &payload)?;
        verify_chain(&leaf, &intermediate, &root, at)?;
        verify_es256(&leaf, header_b64, payload_b64, signature_b64)?;

        if payload.bundle_id.as_deref() != Some(settings.bundle_id) {
            return Err(VerificationStatus::InvalidAppIdentifier);
        }
        if payload.environment.as_deref() != Some(settings.environment.as_str()) {
            return Err(VerificationStatus::InvalidEnvironment);
        }

        Ok(payload)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, VerificationStatus> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| VerificationStatus::VerificationFailure)?;
    serde_json::from_slice(&bytes).map_err(|_| VerificationStatus::VerificationFailure)
}

fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>, VerificationStatus> {
    parse_x509_certificate(der)
        .map(|(_, cert)| cert)
        .map_err(|_| VerificationStatus::InvalidCertificate)
}

fn has_extension(cert: &X509Certificate<'_>, oid: &str) -> bool {
    cert.extensions()
        .iter()
        .any(|ext| ext.oid.to_id_string() == oid)
}

fn verify_chain(
    leaf: &X509Certificate<'_>,
    intermediate: &X509Certificate<'_>,
    root: &X509Certificate<'_>,
    at: ASN1Time,
) -> Result<(), VerificationStatus> {
    let all_valid = [leaf, intermediate, root]
        .iter()
        .all(|cert| cert.validity().is_valid_at(at));
    if !all_valid {
        return Err(VerificationStatus::VerificationFailure);
    }

    intermediate
        .verify_signature(Some(root.public_key()))
        .map_err(|_| VerificationStatus::VerificationFailure)?;
    leaf.verify_signature(Some(intermediate.public_key()))
        .map_err(|_| VerificationStatus::VerificationFailure)?;

    if !has_extension(leaf, LEAF_MARKER_OID) || !has_extension(intermediate, INTERMEDIATE_MARKER_OID)
    {
        return Err(VerificationStatus::VerificationFailure);
    }

    Ok(())
}

fn verify_es256(
    leaf: &X509Certificate<'_>,
    header_b64: &str,
    payload_b64: &str,
    signature_b64: &str,
) -> Result<(), VerificationStatus> {
    let verifying_key = VerifyingKey::from_public_key_der(leaf.public_key().raw)
        .map_err(|_| VerificationStatus::InvalidCertificate)?;

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| VerificationStatus::VerificationFailure)?;
    let signature =
        Signature::from_slice(&sig_bytes).map_err(|_| VerificationStatus::VerificationFailure)?;

    let signing_input = format!("{}.{}", header_b64, payload_b64);
    verifying_key
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| VerificationStatus::VerificationFailure)
}
