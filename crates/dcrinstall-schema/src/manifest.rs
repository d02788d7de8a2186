//! Release manifests.
//!
//! A manifest is a text file of `<sha256 hex> <filename>` lines covering every
//! platform build of one release. Manifests may be clear-signed, in which case
//! only the signed body is parsed.
//!
//! ```text
//! 3f5c...  decred-linux-amd64-v1.7.0.tar.gz
//! 91ab...  decred-linux-arm64-v1.7.0.tar.gz
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::hash::{DigestError, Sha256Digest};

const CLEARTEXT_BEGIN: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const SIGNATURE_BEGIN: &str = "-----BEGIN PGP SIGNATURE-----";

/// Manifest parse and lookup failures.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest could not be read.
    #[error("failed to read manifest {}: {source}", path.display())]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line did not hold exactly two fields.
    #[error("invalid manifest {} line {line}: expected 2 fields, found {fields}", path.display())]
    InvalidLine {
        /// Manifest path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Number of fields found.
        fields: usize,
    },

    /// The digest field is not a SHA256 hex string.
    #[error("invalid manifest {} line {line}: {source}", path.display())]
    InvalidDigest {
        /// Manifest path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Why the digest was rejected.
        #[source]
        source: DigestError,
    },

    /// No entry matched the tuple.
    #[error("no artifact for tuple {tuple} in manifest {}", path.display())]
    NotFound {
        /// Tuple searched for.
        tuple: String,
        /// Manifest path.
        path: PathBuf,
    },

    /// More than one entry matched the tuple.
    #[error(
        "ambiguous tuple {tuple} in manifest {}: {}",
        path.display(),
        matches.join(", ")
    )]
    Ambiguous {
        /// Tuple searched for.
        tuple: String,
        /// Manifest path.
        path: PathBuf,
        /// Every matching file name.
        matches: Vec<String>,
    },
}

/// One `(digest, filename)` line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Expected SHA256 of the artifact.
    pub digest: Sha256Digest,
    /// Artifact file name, relative to the manifest's directory.
    pub filename: String,
}

/// Artifact names a family never installs even when they match the tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Case-insensitive file extension, without the dot.
    Extension(&'static str),
    /// Literal substring of the file name.
    Contains(&'static str),
}

impl Exclusion {
    fn excludes(self, filename: &str) -> bool {
        match self {
            Self::Extension(ext) => {
                let lower = filename.to_lowercase();
                lower
                    .strip_suffix(&ext.to_lowercase())
                    .is_some_and(|stem| stem.ends_with('.'))
            }
            Self::Contains(needle) => filename.contains(needle),
        }
    }
}

/// How a family's artifacts are recognised for a tuple.
#[derive(Debug, Clone, Copy)]
pub struct LocatePolicy {
    /// Character that must follow the tuple in the file name. `Some('-')`
    /// keeps `linux-arm` from matching `linux-arm64`.
    pub separator: Option<char>,
    /// Artifacts skipped even when they match.
    pub exclusions: &'static [Exclusion],
}

impl LocatePolicy {
    fn needle(&self, tuple: &str) -> String {
        match self.separator {
            Some(sep) => format!("{tuple}{sep}"),
            None => tuple.to_string(),
        }
    }

    fn excludes(&self, filename: &str) -> bool {
        self.exclusions.iter().any(|e| e.excludes(filename))
    }
}

/// A parsed manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    source: PathBuf,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// I/O failures and any [`ManifestError`] from [`Manifest::parse`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse manifest text; `source` names the manifest in errors.
    ///
    /// Every line must hold exactly two whitespace-separated fields. Trailing
    /// blank lines are tolerated.
    ///
    /// # Errors
    ///
    /// [`ManifestError::InvalidLine`] or [`ManifestError::InvalidDigest`] with
    /// the 1-based line number in the original text.
    pub fn parse(text: &str, source: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let source = source.into();
        let mut lines = body_lines(text);
        while lines.last().is_some_and(|(_, l)| l.trim().is_empty()) {
            lines.pop();
        }

        let mut entries = Vec::with_capacity(lines.len());
        for (line, text) in lines {
            let fields: Vec<&str> = text.split_whitespace().collect();
            let [digest, filename] = fields.as_slice() else {
                return Err(ManifestError::InvalidLine {
                    path: source,
                    line,
                    fields: fields.len(),
                });
            };
            // sha256sum binary-mode marker
            let filename = filename.strip_prefix('*').unwrap_or(*filename);
            let digest =
                Sha256Digest::new(*digest).map_err(|e| ManifestError::InvalidDigest {
                    path: source.clone(),
                    line,
                    source: e,
                })?;
            entries.push(ManifestEntry {
                digest,
                filename: filename.to_string(),
            });
        }

        Ok(Self { source, entries })
    }

    /// Where this manifest was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Find the single entry for `tuple` under `policy`.
    ///
    /// # Errors
    ///
    /// [`ManifestError::NotFound`] when nothing matches after exclusions,
    /// [`ManifestError::Ambiguous`] when more than one entry does.
    pub fn locate(&self, tuple: &str, policy: &LocatePolicy) -> Result<&ManifestEntry, ManifestError> {
        let needle = policy.needle(tuple);
        let matches: Vec<&ManifestEntry> = self
            .entries
            .iter()
            .filter(|e| e.filename.contains(&needle) && !policy.excludes(&e.filename))
            .collect();

        match matches.as_slice() {
            [entry] => Ok(entry),
            [] => Err(ManifestError::NotFound {
                tuple: tuple.to_string(),
                path: self.source.clone(),
            }),
            many => Err(ManifestError::Ambiguous {
                tuple: tuple.to_string(),
                path: self.source.clone(),
                matches: many.iter().map(|e| e.filename.clone()).collect(),
            }),
        }
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.digest, self.filename)
    }
}

/// Numbered lines of the signed body, or of the whole text when unsigned.
fn body_lines(text: &str) -> Vec<(usize, &str)> {
    let numbered = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')));

    if !text.trim_start().starts_with(CLEARTEXT_BEGIN) {
        return numbered.collect();
    }

    numbered
        .skip_while(|(_, line)| line.trim() != CLEARTEXT_BEGIN)
        .skip(1)
        // armor headers end at the first blank line
        .skip_while(|(_, line)| !line.trim().is_empty())
        .skip(1)
        .take_while(|(_, line)| line.trim() != SIGNATURE_BEGIN)
        .map(|(n, line)| (n, line.strip_prefix("- ").unwrap_or(line)))
        .collect()
}
