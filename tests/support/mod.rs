//! Signed transaction fixtures: a generated root, intermediate and leaf
//! chain carrying the App Store marker extensions, and an ES256 signer.

#![allow(dead_code)]

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CustomExtension, DnType, IsCa, KeyPair,
};
use storewarden::Clock;

const LEAF_MARKER: &[u64] = &[1, 2, 840, 113635, 100, 6, 11, 1];
const INTERMEDIATE_MARKER: &[u64] = &[1, 2, 840, 113635, 100, 6, 2, 1];

/// 2026-01-01T00:00:00Z, inside the generated certificates' validity.
pub const IN_VALIDITY_MS: i64 = 1_767_225_600_000;

/// 2050-01-01T00:00:00Z, after every generated certificate expired.
pub const AFTER_EXPIRY_MS: i64 = 2_524_608_000_000;

/// 2025-01-15T12:00:00Z, used as the payload `signedDate`.
pub const SIGNED_DATE_MS: i64 = 1_736_942_400_000;

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).expect("valid timestamp")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChainOptions {
    pub leaf_marker: bool,
    pub leaf_signed_by_root: bool,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            leaf_marker: true,
            leaf_signed_by_root: false,
        }
    }
}

pub struct TestChain {
    pub root_der: Vec<u8>,
    pub intermediate_der: Vec<u8>,
    pub leaf_der: Vec<u8>,
    leaf_key: SigningKey,
}

fn params(name: &str, ca: bool, marker: Option<&[u64]>) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, name);
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params.not_after = rcgen::date_time_ymd(2040, 1, 1);
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    }
    if let Some(oid) = marker {
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(oid, vec![0x05, 0x00]));
    }
    params
}

fn der(cert: &Certificate) -> Vec<u8> {
    cert.der().to_vec()
}

impl TestChain {
    pub fn generate() -> Self {
        Self::generate_with(ChainOptions::default())
    }

    pub fn generate_with(options: ChainOptions) -> Self {
        let root_key = KeyPair::generate().expect("root key");
        let root = params("Test Root CA", true, None)
            .self_signed(&root_key)
            .expect("root certificate");

        let intermediate_key = KeyPair::generate().expect("intermediate key");
        let intermediate = params("Test WWDR Intermediate", true, Some(INTERMEDIATE_MARKER))
            .signed_by(&intermediate_key, &root, &root_key)
            .expect("intermediate certificate");

        let leaf_key = KeyPair::generate().expect("leaf key");
        let leaf_params = params(
            "Test Receipt Signing",
            false,
            options.leaf_marker.then_some(LEAF_MARKER),
        );
        let leaf = if options.leaf_signed_by_root {
            leaf_params.signed_by(&leaf_key, &root, &root_key)
        } else {
            leaf_params.signed_by(&leaf_key, &intermediate, &intermediate_key)
        }
        .expect("leaf certificate");

        let signing_key =
            SigningKey::from_pkcs8_der(&leaf_key.serialize_der()).expect("leaf signing key");

        Self {
            root_der: der(&root),
            intermediate_der: der(&intermediate),
            leaf_der: der(&leaf),
            leaf_key: signing_key,
        }
    }

    /// Sign `payload` as a compact JWS carrying this chain in `x5c`.
    pub fn sign(&self, payload: &serde_json::Value) -> String {
        let header = serde_json::json!({
            "alg": "ES256",
            "x5c": [
                STANDARD.encode(&self.leaf_der),
                STANDARD.encode(&self.intermediate_der),
                STANDARD.encode(&self.root_der),
            ],
        });
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).expect("header"));
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).expect("payload"));
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        let signature: Signature = self.leaf_key.sign(signing_input.as_bytes());
        format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }
}

pub fn transaction(bundle_id: &str, environment: &str) -> serde_json::Value {
    serde_json::json!({
        "transactionId": "2000000000000001",
        "originalTransactionId": "2000000000000001",
        "bundleId": bundle_id,
        "productId": "com.example.app.pro",
        "type": "Non-Consumable",
        "inAppOwnershipType": "PURCHASED",
        "environment": environment,
        "signedDate": SIGNED_DATE_MS,
    })
}
