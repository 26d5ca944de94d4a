//! Cryptographic primitives for entitlement verification.

pub mod digest;
pub mod freshness;
pub mod receipt;
pub mod verify;
