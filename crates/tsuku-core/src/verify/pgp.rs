//! PGP fingerprint validation and detached-signature verification.
//!
//! Grounded on `sequoia-openpgp`, following `ConaryLabs-Conary`'s choice of
//! the `crypto-rust` backend (no system OpenSSL/Nettle dependency, keeping
//! the hermetic-build story honest for a tool that is itself meant to be
//! installable without system packages).

use std::path::Path;

use sequoia_openpgp::parse::stream::{
    DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper,
};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::policy::StandardPolicy;
use sequoia_openpgp::{Cert, KeyHandle};

use super::VerifyError;

/// Normalize a caller-supplied fingerprint string: strip internal
/// whitespace, lowercase it, and check it's 40 (SHA-1/v4) or 64
/// (SHA-256/v6) hex characters.
pub fn normalize_fingerprint(raw: &str) -> Result<String, VerifyError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned.to_lowercase();

    if !(cleaned.len() == 40 || cleaned.len() == 64) || !cleaned.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(VerifyError::InvalidFingerprint(raw.to_string()));
    }
    Ok(cleaned)
}

/// Parse a key from raw bytes (ASCII-armored or binary) and check its
/// fingerprint against `expected_fingerprint` (already normalized).
///
/// Fingerprint mismatch is fatal, per spec.md §4.2.
pub fn load_and_pin_key(key_bytes: &[u8], expected_fingerprint: &str) -> Result<Cert, VerifyError> {
    let cert = Cert::from_bytes(key_bytes).map_err(|e| VerifyError::Parse(e.to_string()))?;
    let actual = cert.fingerprint().to_hex().to_lowercase();

    if actual != expected_fingerprint {
        return Err(VerifyError::FingerprintMismatch {
            expected: expected_fingerprint.to_string(),
            actual,
        });
    }
    Ok(cert)
}

struct Helper<'a> {
    cert: &'a Cert,
}

impl VerificationHelper for Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> sequoia_openpgp::Result<Vec<Cert>> {
        Ok(vec![self.cert.clone()])
    }

    fn check(&mut self, structure: MessageStructure) -> sequoia_openpgp::Result<()> {
        for layer in structure.into_iter() {
            if let MessageLayer::SignatureGroup { results } = layer {
                for result in results {
                    result.map_err(|e| anyhow::anyhow!(e.to_string()))?;
                }
            }
        }
        Ok(())
    }
}

/// Verify a detached PGP signature over `artifact_path`, using a key
/// already pinned by [`load_and_pin_key`].
pub fn verify_detached_signature(
    artifact_path: &Path,
    signature_bytes: &[u8],
    signer: &Cert,
) -> Result<(), VerifyError> {
    let policy = StandardPolicy::new();
    let helper = Helper { cert: signer };

    let mut verifier = DetachedVerifierBuilder::from_bytes(signature_bytes)
        .map_err(|e| VerifyError::Parse(e.to_string()))?
        .with_policy(&policy, None, helper)
        .map_err(|e| VerifyError::Parse(e.to_string()))?;

    let artifact = std::fs::read(artifact_path)?;
    verifier
        .verify_bytes(&artifact)
        .map_err(|e| VerifyError::SignatureInvalid(e.to_string()))
}
