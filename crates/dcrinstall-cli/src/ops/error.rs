//! Domain-specific errors for install operations

use std::fmt;

use dcrinstall_core::install::BundleError;
use dcrinstall_core::io::extract::ExtractError;
use dcrinstall_core::precondition::PreconditionError;
use dcrinstall_core::process::ProbeError;
use dcrinstall_core::provision::ProvisionError;
use dcrinstall_core::{FetchError, VerifyError};
use dcrinstall_schema::{ManifestError, TupleError, VersionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Process probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Tuple(#[from] TupleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{family}: {stage}: {error}")]
    Stage {
        family: &'static str,
        stage: Stage,
        #[source]
        error: Box<InstallError>,
    },

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl InstallError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }

    /// Innermost error, looking through stage wrappers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { error, .. } => error.root(),
            other => other,
        }
    }
}

/// Pipeline step an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DownloadManifest,
    VerifyManifest,
    LocateArtifact,
    DownloadArtifact,
    ExtractArtifact,
    CheckPreconditions,
    InstallConfigs,
    InstallBinaries,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DownloadManifest => "download manifest",
            Self::VerifyManifest => "verify manifest",
            Self::LocateArtifact => "locate artifact",
            Self::DownloadArtifact => "download artifact",
            Self::ExtractArtifact => "extract artifact",
            Self::CheckPreconditions => "check preconditions",
            Self::InstallConfigs => "install configs",
            Self::InstallBinaries => "install binaries",
        })
    }
}

/// Tag a fallible step with the family and stage it belongs to.
pub trait StageExt<T> {
    fn stage(self, family: &'static str, stage: Stage) -> Result<T, InstallError>;
}

impl<T, E: Into<InstallError>> StageExt<T> for Result<T, E> {
    fn stage(self, family: &'static str, stage: Stage) -> Result<T, InstallError> {
        self.map_err(|e| InstallError::Stage {
            family,
            stage,
            error: Box::new(e.into()),
        })
    }
}
