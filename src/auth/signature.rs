// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ed25519 detached signature verification.
//!
//! Wallets sign the raw UTF-8 bytes of a challenge message. The server only
//! ever sees public keys.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use super::AuthError;

/// Verify an Ed25519 signature.
///
/// Returns `false` for wrong key or signature lengths, keys that are not
/// valid curve points, and signatures that do not verify.
pub fn verify_ed25519(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Some(key) = verifying_key(public_key) else {
        return false;
    };
    Signature::from_slice(signature).is_ok_and(|sig| key.verify(message, &sig).is_ok())
}

/// Decode a base58 segment, mapping failure to `MalformedToken`.
pub fn decode_base58(segment: &str) -> Result<Vec<u8>, AuthError> {
    bs58::decode(segment)
        .into_vec()
        .map_err(|_| AuthError::MalformedToken)
}

/// Decode a wallet address into the raw public key it encodes.
///
/// The address must be base58 of exactly 32 bytes forming a valid curve
/// point.
pub fn decode_address(address: &str) -> Result<[u8; 32], AuthError> {
    let bytes = decode_base58(address)?;
    verifying_key(&bytes)
        .map(|key| key.to_bytes())
        .ok_or(AuthError::MalformedToken)
}

fn verifying_key(bytes: &[u8]) -> Option<VerifyingKey> {
    let bytes: &[u8; 32] = bytes.try_into().ok()?;
    VerifyingKey::from_bytes(bytes).ok()
}
