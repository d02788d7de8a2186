//! SHA256 digests as they appear in release manifests.
//!
//! Parsing accepts an optional `sha256:` prefix and either case, and always
//! stores the digest as lowercase hex so comparisons are plain string equality.

use thiserror::Error;

/// Rejected digest text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// Wrong number of hex characters.
    #[error("invalid SHA256 digest: expected 64 hex characters, got {len} in '{value}'")]
    Length {
        /// Offending input.
        value: String,
        /// Number of characters after any prefix was removed.
        len: usize,
    },
    /// Non-hex characters present.
    #[error("invalid SHA256 digest: contains non-hex characters in '{0}'")]
    NotHex(String),
}

/// A validated SHA256 digest (64 lowercase hex characters)
///
/// Manifest entries and operator-pinned manifest digests are parsed into this
/// type so that comparisons against a freshly computed digest are plain string
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the hex portion is not exactly 64 ASCII hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(DigestError::Length {
                len: hex.len(),
                value: s,
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NotHex(s));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Sha256Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn digest_is_lowercased() {
        let upper = EMPTY.to_uppercase();
        let digest = Sha256Digest::new(upper).unwrap();
        assert_eq!(digest.as_str(), EMPTY);
    }

    #[test]
    fn digest_accepts_prefix() {
        let digest = Sha256Digest::new(format!("sha256:{EMPTY}")).unwrap();
        assert_eq!(digest.as_str(), EMPTY);
    }

    #[test]
    fn digest_rejects_bad_input() {
        assert!(matches!(
            Sha256Digest::new("abc"),
            Err(DigestError::Length { len: 3, .. })
        ));
        let not_hex = format!("{}zz", &EMPTY[..62]);
        assert!(matches!(
            Sha256Digest::new(not_hex),
            Err(DigestError::NotHex(_))
        ));
    }
}
