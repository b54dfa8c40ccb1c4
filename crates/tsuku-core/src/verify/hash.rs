//! Streamed file hashing and checksum-manifest parsing.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256, Sha512};

use super::VerifyError;

/// Supported checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algo {
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl Algo {
    /// Parse an algorithm name as used in recipe `checksum_algo` params.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

const CHUNK_SIZE: usize = 64 * 1024;

/// Stream-hash a file with the given algorithm, never holding the whole
/// file in memory.
pub fn hash_file(path: &Path, algo: Algo) -> Result<String, VerifyError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buf = vec![0u8; CHUNK_SIZE];

    match algo {
        Algo::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hex::encode(hasher.finalize()))
        }
        Algo::Sha512 => {
            let mut hasher = Sha512::new();
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hex::encode(hasher.finalize()))
        }
    }
}

/// Hash a file and compare it against an expected digest.
///
/// Equality is checked with plain string comparison: both sides are
/// derived from configuration tsuku itself controls (the recipe's pinned
/// checksum and the file just downloaded), not from a secret, so there's no
/// timing-side-channel concern that would call for constant-time comparison.
pub fn verify_file(path: &Path, expected: &str, algo: Algo) -> Result<(), VerifyError> {
    let actual = hash_file(path, algo)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(VerifyError::Mismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Parse a checksum manifest, returning the digest for `target_filename`.
///
/// Supports two formats:
/// - A single line containing only a hex digest (no filename): returned
///   unconditionally.
/// - One or more `<hex>  <filename>` lines (the `sha256sum`/`shasum`
///   convention): the line whose filename matches `target_filename`
///   (by exact match or basename match) is returned.
///
/// Per the Open Question in spec.md §9(a): a multi-line manifest with no
/// line matching `target_filename` is a [`VerifyError::Manifest`], not a
/// silent fallback to the first line.
pub fn parse_checksum_manifest(
    contents: &str,
    target_filename: &str,
) -> Result<String, VerifyError> {
    let lines: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(VerifyError::Manifest("empty checksum manifest".to_string()));
    }

    if lines.len() == 1 {
        let mut parts = lines[0].split_whitespace();
        let digest = parts.next().unwrap_or_default();
        if parts.next().is_none() {
            return Ok(digest.to_string());
        }
    }

    let target_base = Path::new(target_filename)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(target_filename);

    for line in &lines {
        let mut parts = line.splitn(2, char::is_whitespace);
        let Some(digest) = parts.next() else {
            continue;
        };
        let Some(name) = parts.next() else {
            continue;
        };
        let name = name.trim().trim_start_matches('*');
        let name_base = Path::new(name).file_name().and_then(|f| f.to_str()).unwrap_or(name);

        if name == target_filename || name_base == target_base {
            return Ok(digest.to_string());
        }
    }

    Err(VerifyError::Manifest(format!(
        "no entry for '{target_filename}' in checksum manifest"
    )))
}
