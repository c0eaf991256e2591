//! Hash algorithms and validated digest values.
//!
//! Every digest entering the index is normalized here: exact hex length for
//! its algorithm, hex charset only, lowercased. Downstream comparisons
//! (whitelist membership, uniqueness grouping, the SQL views) are then plain
//! equality on the normalized form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The three digest algorithms an acquisition may have computed.
///
/// A real acquisition often computes only a subset of these (hashing is a
/// cost/time tradeoff during collection), which is why elements carry three
/// independent optional digest fields rather than one algorithm+value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Md5,
}

impl HashAlgorithm {
    /// All algorithms, in the order the cross-algorithm merger visits them.
    pub const ALL: [HashAlgorithm; 3] = [Self::Sha1, Self::Sha256, Self::Md5];

    /// Expected length of the hexadecimal representation.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Md5 => 32,
        }
    }

    /// Lowercase name as used in CLI arguments and column names.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            other => Err(DigestError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Errors from digest validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    /// Digest string has the wrong length for its algorithm.
    #[error("{algorithm} digest must be {expected} hex chars, got {actual}")]
    BadLength {
        algorithm: HashAlgorithm,
        expected: usize,
        actual: usize,
    },

    /// Digest string contains a non-hexadecimal character.
    #[error("{algorithm} digest contains non-hex character {found:?}")]
    BadCharset {
        algorithm: HashAlgorithm,
        found: char,
    },

    /// Algorithm name not one of sha1/sha256/md5.
    #[error("unknown hash algorithm {0:?}")]
    UnknownAlgorithm(String),
}

/// A validated, lowercase hexadecimal digest value.
///
/// Construction is the only place charset and length are checked; everything
/// past this point trusts the invariant and compares digests byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    algorithm: HashAlgorithm,
    hex: String,
}

impl Digest {
    /// Validate and normalize a hex string into a digest.
    ///
    /// Uppercase hex is accepted and lowercased; wrong length or non-hex
    /// characters are rejected.
    pub fn new(algorithm: HashAlgorithm, hex: &str) -> Result<Self, DigestError> {
        if hex.len() != algorithm.hex_len() {
            return Err(DigestError::BadLength {
                algorithm,
                expected: algorithm.hex_len(),
                actual: hex.len(),
            });
        }
        if let Some(found) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(DigestError::BadCharset { algorithm, found });
        }
        Ok(Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// The algorithm this digest was computed with.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Normalized lowercase hex representation.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}
