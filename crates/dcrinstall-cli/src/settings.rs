//! Immutable run settings.
//!
//! Built once from the parsed command line and never mutated afterwards.

use std::path::{Path, PathBuf};

use dcrinstall_schema::{Network, Sha256Digest, Tuple};
use thiserror::Error;

use crate::Cli;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot determine home directory; pass --dest")]
    NoHome,

    #[error("cannot resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("nothing to install: --skip-decred given without --dcrdex or --bitcoin")]
    NothingEnabled,

    #[error("--skip-download requires --path")]
    MissingPath,

    #[error("--skip-download and --download-only are mutually exclusive")]
    ConflictingDownloadModes,
}

/// Terminal log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
        }
    }
}

/// Where a family's manifest comes from and how it is trusted.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    pub uri: String,
    /// Optional pin on the manifest file itself.
    pub digest: Option<Sha256Digest>,
    /// Replaces the built-in signing key.
    pub public_key: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub destination: PathBuf,
    /// Platform being installed.
    pub tuple: Tuple,
    /// Platform this process runs on.
    pub runtime: Tuple,
    pub network: Network,
    pub skip_pgp: bool,
    pub force_download: bool,
    pub allow_running: bool,
    pub download_only: bool,
    pub skip_download: bool,
    pub path: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// `None` disables the family.
    pub decred: Option<ManifestSource>,
    pub dcrdex: Option<ManifestSource>,
    pub bitcoin: Option<ManifestSource>,
}

impl Settings {
    /// Snapshot the parsed command line.
    pub fn from_cli(cli: Cli) -> Result<Self, SettingsError> {
        let destination = match cli.dest {
            Some(dest) => dest,
            None => dirs::home_dir().ok_or(SettingsError::NoHome)?.join("decred"),
        };

        let verbosity = if cli.quiet {
            Verbosity::Quiet
        } else if cli.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        let source = |enabled: bool, uri: String, digest, public_key| {
            enabled.then(|| ManifestSource {
                uri,
                digest,
                public_key,
            })
        };

        let runtime = Tuple::current();
        let settings = Self {
            destination: absolute(&destination)?,
            tuple: cli.tuple.unwrap_or_else(|| runtime.clone()),
            runtime,
            network: cli.net,
            skip_pgp: cli.skip_pgp,
            force_download: cli.force_download,
            allow_running: cli.allow_running,
            download_only: cli.download_only,
            skip_download: cli.skip_download,
            path: cli.path.as_deref().map(absolute).transpose()?,
            verbosity,
            decred: source(
                !cli.skip_decred,
                cli.decred_manifest,
                cli.decred_manifest_digest,
                cli.decred_pubkey,
            ),
            dcrdex: source(
                cli.dcrdex,
                cli.dcrdex_manifest,
                cli.dcrdex_manifest_digest,
                cli.dcrdex_pubkey,
            ),
            bitcoin: source(
                cli.bitcoin,
                cli.bitcoin_manifest,
                cli.bitcoin_manifest_digest,
                cli.bitcoin_pubkey,
            ),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations clap cannot express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.decred.is_none() && self.dcrdex.is_none() && self.bitcoin.is_none() {
            return Err(SettingsError::NothingEnabled);
        }
        if self.skip_download && self.path.is_none() {
            return Err(SettingsError::MissingPath);
        }
        if self.skip_download && self.download_only {
            return Err(SettingsError::ConflictingDownloadModes);
        }
        Ok(())
    }

    /// Returns `true` when installing for another platform.
    pub fn is_foreign(&self) -> bool {
        self.tuple != self.runtime
    }

    /// Location of the run log.
    pub fn log_file(&self) -> PathBuf {
        self.destination.join("dcrinstall.log")
    }
}

fn absolute(path: &Path) -> Result<PathBuf, SettingsError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(SettingsError::CurrentDir)?;
    Ok(cwd.join(path))
}
