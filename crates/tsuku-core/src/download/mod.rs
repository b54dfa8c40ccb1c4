//! HTTPS-only retrying downloader plus the content-addressed download cache.
//!
//! Grounded on the teacher's `io::download` (reqwest streaming, hash-as-you-go
//! download) but built around SHA-256 instead of BLAKE3, and with the
//! transport hardening (HTTPS-only, redirect-downgrade refusal, retry policy)
//! and on-disk cache that spec.md §4.4 requires and the teacher doesn't
//! implement (APL always re-downloads into its CAS and lets the CAS dedupe).

mod cache;
mod client;

pub use cache::{CacheMeta, DownloadCache};
pub use client::{DownloadOutcome, Downloader};

use thiserror::Error;

/// Errors from the downloader or its cache.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The underlying HTTP client failed (connect, TLS, malformed response).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O failure writing the downloaded bytes or cache metadata.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded bytes didn't match the caller-supplied checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Expected digest.
        expected: String,
        /// Digest actually computed.
        actual: String,
    },

    /// A URL didn't use `https://`.
    #[error("refusing non-HTTPS URL: {0}")]
    InsecureScheme(String),

    /// The server replied with a non-identity `Content-Encoding`, which
    /// would let it smuggle a decompression bomb past our checksum check.
    #[error("refusing unexpected Content-Encoding: {0}")]
    UnexpectedContentEncoding(String),

    /// All retry attempts were exhausted against a retryable status code.
    #[error("download failed after retries: HTTP {status}")]
    RetriesExhausted {
        /// The last observed HTTP status code.
        status: u16,
    },

    /// A non-retryable HTTP status code was returned.
    #[error("download failed: HTTP {status}")]
    StatusError {
        /// The HTTP status code.
        status: u16,
    },

    /// The download cache directory is a symlink or has overly permissive
    /// mode bits.
    #[error("insecure cache directory {path}: {reason}")]
    CacheInsecure {
        /// The cache directory path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The operation was cancelled via the execution context's cancellation
    /// token.
    #[error("download cancelled")]
    Cancelled,
}

/// Status codes the downloader retries, per spec.md §4.4: some CDNs use 403
/// for rate limiting, 408/425/429 signal "try again", and 5xx is transient
/// server-side.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 403 | 408 | 425 | 429) || (500..600).contains(&status)
}
