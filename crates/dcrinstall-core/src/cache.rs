//! Artifact cache.
//!
//! Extracted bundles stay in the destination tree under their versioned
//! directory name. After a successful extraction the archive digest is written
//! into that directory; a later run may skip fetching the archive only when the
//! directory, the recorded digest and every expected payload path are present.
//! Anything less counts as unseen, costing a redundant download at worst.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dcrinstall_schema::Sha256Digest;
use tracing::debug;

const DIGEST_MARKER: &str = ".dcrinstall-digest";

/// Record of bundles already extracted below a destination root.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
    force: bool,
}

impl ArtifactCache {
    /// Cache over `root`. With `force` every bundle is treated as unseen.
    pub fn new(root: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            root: root.into(),
            force,
        }
    }

    /// Directory a bundle extracts to.
    pub fn bundle_dir(&self, bundle: &str) -> PathBuf {
        self.root.join(bundle)
    }

    /// Whether `bundle` was extracted from the archive with `digest` and
    /// still holds every path in `payload` (relative to the bundle directory).
    pub fn seen_before(&self, bundle: &str, digest: &Sha256Digest, payload: &[PathBuf]) -> bool {
        if self.force {
            return false;
        }

        let dir = self.bundle_dir(bundle);
        let recorded = fs::read_to_string(dir.join(DIGEST_MARKER)).unwrap_or_default();
        if recorded.trim() != digest.as_str() {
            debug!(bundle, "no matching digest record");
            return false;
        }

        let missing: Vec<&PathBuf> = payload.iter().filter(|p| !dir.join(p).exists()).collect();
        if !missing.is_empty() {
            debug!(bundle, ?missing, "extracted bundle is incomplete");
            return false;
        }
        true
    }

    /// Record that `bundle` was fully extracted from the archive with `digest`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the record cannot be written.
    pub fn mark_extracted(&self, bundle: &str, digest: &Sha256Digest) -> io::Result<()> {
        let dir = self.bundle_dir(bundle);
        fs::write(dir.join(DIGEST_MARKER), format!("{digest}\n"))
    }

    /// Destination root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
