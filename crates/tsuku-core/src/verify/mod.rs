//! Verification primitives: streamed hashing, checksum-manifest parsing,
//! and PGP detached-signature checks.
//!
//! Grounded on the teacher's `io::download` (streaming `blake3::Hasher`
//! over a byte stream) generalized to SHA-256/512 per spec.md §4.2, plus a
//! new checksum-manifest parser and PGP backend the teacher doesn't need
//! (APL only ever checks its own BLAKE3-keyed index).

/// Streamed SHA-256/512 hashing and checksum-manifest parsing.
pub mod hash;
/// PGP fingerprint validation and detached-signature verification.
pub mod pgp;

use thiserror::Error;

/// Errors from any verification primitive.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// I/O failure while reading the file or manifest.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A computed hash didn't match the expected one.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// The expected digest.
        expected: String,
        /// The actual digest computed from the file.
        actual: String,
    },

    /// A checksum manifest couldn't be parsed, or was ambiguous.
    #[error("checksum manifest error: {0}")]
    Manifest(String),

    /// A PGP fingerprint string wasn't 40 or 64 hex characters.
    #[error("invalid PGP fingerprint '{0}': expected 40 (SHA-1) or 64 (SHA-256) hex characters")]
    InvalidFingerprint(String),

    /// The fetched key's fingerprint didn't match the one the caller pinned.
    #[error("PGP fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch {
        /// The caller-supplied, pinned fingerprint.
        expected: String,
        /// The fingerprint of the key actually fetched.
        actual: String,
    },

    /// The detached signature did not verify over the artifact.
    #[error("PGP signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Malformed key or signature material.
    #[error("PGP parse error: {0}")]
    Parse(String),
}
