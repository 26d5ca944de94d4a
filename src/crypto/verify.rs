//! RSA PKCS#1 v1.5 / SHA-1 signature verification for Play licensing.

use crate::LicensingError;
use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Verifying key for Play licensing responses.
pub type PlayStoreKey = RsaPublicKey;

/// Why a detached signature did not verify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Signature was not valid base64.
    #[error("malformed signature: {0}")]
    Malformed(String),

    /// Signature decoded but does not match the message.
    #[error("signature does not match")]
    Mismatch,
}

/// Decode a base64, DER-encoded RSA `SubjectPublicKeyInfo`.
///
/// # Errors
/// * `InvalidPublicKey` - not base64, not DER, or not an RSA key
pub fn decode_public_key(key_b64: &str) -> Result<PlayStoreKey, LicensingError> {
    let der = STANDARD
        .decode(key_b64.trim())
        .map_err(|e| LicensingError::InvalidPublicKey(format!("Invalid base64: {}", e)))?;

    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| LicensingError::InvalidPublicKey(format!("Not an RSA public key: {}", e)))
}

/// Verify a base64 detached signature over `message`.
pub fn verify_pkcs1v15_sha1(
    key: &PlayStoreKey,
    signature_b64: &str,
    message: &[u8],
) -> Result<(), SignatureError> {
    let sig_bytes = STANDARD
        .decode(signature_b64)
        .map_err(|e| SignatureError::Malformed(format!("Invalid base64: {}", e)))?;

    let hashed = Sha1::digest(message);
    key.verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, &sig_bytes)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::RsaPrivateKey;

    static PRIVATE_KEY: Lazy<RsaPrivateKey> = Lazy::new(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("key generation")
    });

    fn public_key_b64() -> String {
        let der = PRIVATE_KEY
            .to_public_key()
            .to_public_key_der()
            .expect("encode public key");
        STANDARD.encode(der.as_bytes())
    }

    fn sign(message: &[u8]) -> String {
        let signature = PRIVATE_KEY
            .sign(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(message))
            .expect("sign");
        STANDARD.encode(signature)
    }

    #[test]
    fn test_decode_public_key_valid() {
        assert!(decode_public_key(&public_key_b64()).is_ok());
    }

    #[test]
    fn test_decode_public_key_not_base64() {
        let result = decode_public_key("not-base64!");
        assert!(matches!(result, Err(LicensingError::InvalidPublicKey(_))));
    }

    #[test]
    fn test_decode_public_key_not_der() {
        let result = decode_public_key(&STANDARD.encode(b"definitely not a key"));
        assert!(matches!(result, Err(LicensingError::InvalidPublicKey(_))));
    }

    #[test]
    fn test_verify_valid_signature() {
        let key = decode_public_key(&public_key_b64()).unwrap();
        let message = b"0|1|com.example.app|1|u|1736942400000:x";
        assert_eq!(verify_pkcs1v15_sha1(&key, &sign(message), message), Ok(()));
    }

    #[test]
    fn test_verify_tampered_message() {
        let key = decode_public_key(&public_key_b64()).unwrap();
        let signature = sign(b"0|1|com.example.app");
        assert_eq!(
            verify_pkcs1v15_sha1(&key, &signature, b"1|1|com.example.app"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_signature_not_base64() {
        let key = decode_public_key(&public_key_b64()).unwrap();
        let result = verify_pkcs1v15_sha1(&key, "%%%", b"msg");
        assert!(matches!(result, Err(SignatureError::Malformed(_))));
    }

    #[test]
    fn test_verify_wrong_length_signature() {
        let key = decode_public_key(&public_key_b64()).unwrap();
        let result = verify_pkcs1v15_sha1(&key, &STANDARD.encode([0u8; 16]), b"msg");
        assert_eq!(result, Err(SignatureError::Mismatch));
    }
}
