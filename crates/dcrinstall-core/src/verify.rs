//! Integrity verification.
//!
//! Manifests are trusted through an OpenPGP signature (detached `.asc` file or
//! clear-signed document). Artifacts are trusted through the SHA256 digest the
//! signed manifest lists for them.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use dcrinstall_schema::Sha256Digest;
use pgp::cleartext::CleartextSignedMessage;
use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid public key: {0}")]
    PublicKey(String),

    #[error("signature incorrect: {0}")]
    BadSignature(String),

    /// The signature uses an algorithm or curve the PGP implementation cannot
    /// check. Callers decide whether that is tolerable for a given signer.
    #[error("signature uses an unsupported algorithm: {0}")]
    Unsupported(String),

    #[error("corrupt digest for {}: expected {expected}, got {actual}", path.display())]
    CorruptDigest {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl VerifyError {
    /// Returns `true` when verification could not be attempted rather than
    /// having failed.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// OpenPGP signature checks over in-memory data.
pub trait SignatureVerifier: Send + Sync {
    /// Check an armored detached `signature` over `content`.
    fn verify_detached(&self, content: &[u8], signature: &str, public_key: &str)
    -> Result<(), VerifyError>;

    /// Check a clear-signed `document`.
    fn verify_attached(&self, document: &str, public_key: &str) -> Result<(), VerifyError>;
}

/// [`SignatureVerifier`] backed by rPGP.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgpVerifier;

fn classify(err: pgp::errors::Error) -> VerifyError {
    match err {
        pgp::errors::Error::Unsupported(msg) | pgp::errors::Error::Unimplemented(msg) => {
            VerifyError::Unsupported(msg)
        }
        other => VerifyError::BadSignature(other.to_string()),
    }
}

fn keyring(armored: &str) -> Result<SignedPublicKey, VerifyError> {
    let (key, _headers) = SignedPublicKey::from_string(armored)
        .map_err(|e| VerifyError::PublicKey(e.to_string()))?;
    key.verify()
        .map_err(|e| VerifyError::PublicKey(e.to_string()))?;
    Ok(key)
}

impl SignatureVerifier for PgpVerifier {
    fn verify_detached(
        &self,
        content: &[u8],
        signature: &str,
        public_key: &str,
    ) -> Result<(), VerifyError> {
        let key = keyring(public_key)?;
        let (sig, _headers) = StandaloneSignature::from_string(signature)
            .map_err(|e| VerifyError::BadSignature(e.to_string()))?;

        // Release keys usually sign with a subkey.
        let primary = sig.verify(&key, content);
        if primary.is_ok()
            || key
                .public_subkeys
                .iter()
                .any(|sub| sig.verify(sub, content).is_ok())
        {
            return Ok(());
        }
        primary.map_err(classify)
    }

    fn verify_attached(&self, document: &str, public_key: &str) -> Result<(), VerifyError> {
        let key = keyring(public_key)?;
        let (msg, _headers) = CleartextSignedMessage::from_string(document)
            .map_err(|e| VerifyError::BadSignature(e.to_string()))?;

        let primary = msg.verify(&key).map(|_| ());
        if primary.is_ok()
            || key
                .public_subkeys
                .iter()
                .any(|sub| msg.verify(sub).is_ok())
        {
            return Ok(());
        }
        primary.map_err(classify)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, VerifyError> {
    std::fs::read(path).map_err(|source| VerifyError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Verify `signature_file` is a detached signature over `content_file`.
///
/// # Errors
///
/// I/O failures, an unusable key, or a signature that does not authenticate
/// the content.
pub fn verify_detached_signature(
    verifier: &dyn SignatureVerifier,
    signature_file: &Path,
    content_file: &Path,
    public_key: &str,
) -> Result<(), VerifyError> {
    let signature = read_file(signature_file)?;
    let content = read_file(content_file)?;
    verifier.verify_detached(&content, &String::from_utf8_lossy(&signature), public_key)
}

/// Verify a clear-signed file.
///
/// # Errors
///
/// Same as [`verify_detached_signature`].
pub fn verify_attached_signature(
    verifier: &dyn SignatureVerifier,
    file: &Path,
    public_key: &str,
) -> Result<(), VerifyError> {
    let document = read_file(file)?;
    verifier.verify_attached(&String::from_utf8_lossy(&document), public_key)
}

/// Stream `path` through SHA256 and return the lowercase hex digest.
///
/// # Errors
///
/// Returns [`VerifyError::Io`] if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String, VerifyError> {
    let io_err = |source| VerifyError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check `path` hashes to `expected`.
///
/// # Errors
///
/// [`VerifyError::CorruptDigest`] naming the file on mismatch.
pub fn verify_digest(path: &Path, expected: &Sha256Digest) -> Result<(), VerifyError> {
    let actual = sha256_file(path)?;
    if actual == expected.as_str() {
        Ok(())
    } else {
        Err(VerifyError::CorruptDigest {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}
