//! Shared run context.
//!
//! This module defines the `RunContext` struct, which groups the immutable
//! settings, the generated credentials and the side-effecting capabilities
//! used throughout an installation run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use dcrinstall_core::{
    AppDirs, ArtifactCache, Fetcher, HttpFetcher, PgpVerifier, ProcessProbe, ProcessProvisioner,
    Provisioner, SignatureVerifier, SystemProbe,
};
use rand::RngCore;
use tempfile::TempDir;

use crate::ops::InstallError;
use crate::settings::Settings;

/// RPC credentials shared by every config written in one run, so nodes,
/// wallets and clients agree with each other.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn generate() -> Self {
        Self {
            username: random_b64::<12>(),
            password: random_b64::<24>(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn random_b64<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// The capabilities a run depends on, injectable for tests.
#[derive(Clone)]
pub struct Capabilities {
    pub fetcher: Arc<dyn Fetcher>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub probe: Arc<dyn ProcessProbe>,
    pub provisioner: Arc<dyn Provisioner>,
}

impl Capabilities {
    /// Real network, OpenPGP, process listing and tool execution.
    pub fn system(settings: &Settings) -> Self {
        Self {
            fetcher: Arc::new(HttpFetcher::default()),
            verifier: Arc::new(PgpVerifier),
            probe: Arc::new(SystemProbe::new(&settings.destination)),
            provisioner: Arc::new(ProcessProvisioner),
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

enum DownloadDir {
    /// Removed when the run ends.
    Scratch(TempDir),
    /// Operator-supplied or deliberately kept.
    Fixed(PathBuf),
}

impl DownloadDir {
    fn path(&self) -> &Path {
        match self {
            Self::Scratch(dir) => dir.path(),
            Self::Fixed(path) => path,
        }
    }
}

/// Groups common state used during installation operations.
pub struct RunContext {
    pub settings: Settings,
    pub credentials: Credentials,
    pub app_dirs: AppDirs,
    pub caps: Capabilities,
    downloads: DownloadDir,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("settings", &self.settings)
            .field("credentials", &self.credentials)
            .field("downloads", &self.download_dir())
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Context backed by the real system.
    pub fn new(settings: Settings) -> Result<Self, InstallError> {
        let app_dirs = AppDirs::from_env()
            .ok_or_else(|| InstallError::Validation("cannot determine home directory".into()))?;
        let caps = Capabilities::system(&settings);
        Self::with_capabilities(settings, app_dirs, caps)
    }

    /// Context with explicit application directories and capabilities.
    pub fn with_capabilities(
        settings: Settings,
        app_dirs: AppDirs,
        caps: Capabilities,
    ) -> Result<Self, InstallError> {
        let downloads = match &settings.path {
            Some(path) => {
                std::fs::create_dir_all(path)?;
                DownloadDir::Fixed(path.clone())
            }
            None => {
                let dir = tempfile::Builder::new().prefix("dcrinstall").tempdir()?;
                if settings.download_only {
                    DownloadDir::Fixed(dir.keep())
                } else {
                    DownloadDir::Scratch(dir)
                }
            }
        };

        Ok(Self {
            settings,
            credentials: Credentials::generate(),
            app_dirs,
            caps,
            downloads,
        })
    }

    /// Where manifests, signatures and archives are stored.
    pub fn download_dir(&self) -> &Path {
        self.downloads.path()
    }

    pub fn cache(&self) -> ArtifactCache {
        ArtifactCache::new(&self.settings.destination, self.settings.force_download)
    }
}
