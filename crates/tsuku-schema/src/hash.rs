//! Validated hex-digest newtypes.
//!
//! Keeping these distinct from plain `String` means a digest that has
//! passed through `Sha256Digest::new` is guaranteed to be 64 well-formed hex
//! characters at every call site that accepts one, the same guarantee the
//! teacher's `Sha256Digest` makes.

use std::fmt;
use thiserror::Error;

/// A digest string failed validation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DigestError {
    /// The string was not the expected length once any `algo:` prefix and
    /// internal whitespace were stripped.
    #[error("invalid {algo} digest: expected {expected} hex characters, got {actual} in '{raw}'")]
    WrongLength {
        /// Algorithm name, for the error message.
        algo: &'static str,
        /// Expected hex-character count.
        expected: usize,
        /// Hex-character count actually found.
        actual: usize,
        /// The original input, for diagnostics.
        raw: String,
    },
    /// The string contained non-hex characters.
    #[error("invalid {algo} digest: contains non-hex characters in '{raw}'")]
    NotHex {
        /// Algorithm name, for the error message.
        algo: &'static str,
        /// The original input, for diagnostics.
        raw: String,
    },
}

macro_rules! digest_newtype {
    ($name:ident, $algo:literal, $len:literal) => {
        #[doc = concat!("A validated ", $algo, " digest (", stringify!($len), " hex characters).")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Parse and validate a ", $algo, " digest.")]
            ///
            /// Accepts an optional `<algo>:` prefix and strips internal
            /// whitespace before validating, matching the PGP-fingerprint
            /// normalization rules in the verification primitives.
            ///
            /// # Errors
            ///
            /// Returns [`DigestError`] if the hex portion is not exactly
            #[doc = concat!(stringify!($len), " hex characters.")]
            pub fn new(s: impl AsRef<str>) -> Result<Self, DigestError> {
                let raw = s.as_ref();
                let prefix = concat!($algo, ":");
                let stripped = raw.strip_prefix(prefix).unwrap_or(raw);
                let cleaned: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

                if cleaned.len() != $len {
                    return Err(DigestError::WrongLength {
                        algo: $algo,
                        expected: $len,
                        actual: cleaned.len(),
                        raw: raw.to_string(),
                    });
                }
                if !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(DigestError::NotHex {
                        algo: $algo,
                        raw: raw.to_string(),
                    });
                }

                Ok(Self(cleaned.to_lowercase()))
            }

            /// The digest as a lowercase hex string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

digest_newtype!(Sha256Digest, "sha256", 64);
digest_newtype!(Sha512Digest, "sha512", 128);
