//! Installation Flow Typestate Pattern
//!
//! Models one family's pipeline as a series of explicit state transitions:
//!
//! ```text
//! UnverifiedManifest --[verify()]--> VerifiedManifest --[locate()]--> LocatedBundle
//!
//! LocatedBundle --[download()]--> DownloadedBundle          (download only)
//! LocatedBundle --[prepare()]---> PreparedBundle --[check()]--> CheckedBundle
//! ```
//!
//! This enforces at compile-time that nothing is located in a manifest whose
//! signature was not checked, nothing is extracted whose digest was not
//! checked, and nothing is installed before the family's preconditions held.
//!
//! # Usage
//!
//! ```ignore
//! let manifest = UnverifiedManifest::fetch(&ctx, family).await?;
//! let located = manifest.verify(&ctx, &mut notices).await?.locate(&ctx)?;
//! let checked = located.prepare(&ctx).await?.check(&ctx)?;
//! checked.install_configs(&ctx, &mut notices)?;
//! checked.install_binaries(&ctx)?;
//! ```

use std::path::{Path, PathBuf};

use dcrinstall_core::install::{self, payload_name};
use dcrinstall_core::io::extract::extract_auto;
use dcrinstall_core::io::fetch::{base_uri, filename_from_uri};
use dcrinstall_core::precondition::{CheckRequest, InstallState, Presence, check_preconditions};
use dcrinstall_core::verify::{verify_attached_signature, verify_detached_signature, verify_digest};
use dcrinstall_schema::{Component, Manifest, ManifestEntry, Sample};
use tracing::{debug, info, warn};

use crate::family::{Family, SignatureScheme};
use crate::keys;
use crate::ops::{InstallError, RunContext, Stage, StageExt};
use crate::settings::ManifestSource;

/// State 1: a manifest on disk whose origin has not been established.
///
/// # Transitions
///
/// - [`verify()`](Self::verify) -> [`VerifiedManifest`]
#[derive(Debug)]
pub struct UnverifiedManifest<'a> {
    family: &'a dyn Family,
    source: &'a ManifestSource,
    path: PathBuf,
}

/// State 2: a parsed manifest that passed the digest pin and signature check.
///
/// # Transitions
///
/// - [`locate()`](Self::locate) -> [`LocatedBundle`]
#[derive(Debug)]
pub struct VerifiedManifest<'a> {
    family: &'a dyn Family,
    source: &'a ManifestSource,
    manifest: Manifest,
}

/// State 3: the single artifact for this platform.
///
/// # Transitions
///
/// - [`download()`](Self::download) -> [`DownloadedBundle`]
/// - [`prepare()`](Self::prepare) -> [`PreparedBundle`]
#[derive(Debug)]
pub struct LocatedBundle<'a> {
    family: &'a dyn Family,
    /// Manifest line naming the artifact.
    pub entry: ManifestEntry,
    /// Where the artifact is fetched from.
    pub uri: String,
    /// Directory name the archive extracts to.
    pub bundle: String,
}

/// A fetched archive whose digest matched the manifest.
#[derive(Debug)]
pub struct DownloadedBundle {
    pub archive: PathBuf,
}

/// State 4: the bundle is extracted below the destination.
///
/// # Transitions
///
/// - [`check()`](Self::check) -> [`CheckedBundle`]
#[derive(Debug)]
pub struct PreparedBundle<'a> {
    family: &'a dyn Family,
    /// Extracted bundle root.
    pub root: PathBuf,
}

/// State 5: preconditions hold; configs and binaries may be written.
#[derive(Debug)]
pub struct CheckedBundle<'a> {
    family: &'a dyn Family,
    pub root: PathBuf,
    pub state: InstallState,
}

/// Path of `filename` for this run: read in place with `--skip-download`,
/// otherwise fetched from `uri` into the download directory.
async fn obtain(ctx: &RunContext, uri: &str, filename: &str) -> Result<PathBuf, InstallError> {
    if ctx.settings.skip_download {
        let dir = ctx.settings.path.as_deref().unwrap_or(ctx.download_dir());
        let path = dir.join(filename);
        if !path.exists() {
            return Err(InstallError::context(
                "skip download",
                format!("{} not found", path.display()),
            ));
        }
        debug!(path = %path.display(), "using local file");
        return Ok(path);
    }

    let dest = ctx.download_dir().join(filename);
    info!(uri, "downloading");
    ctx.caps.fetcher.fetch(uri, &dest).await?;
    Ok(dest)
}

impl<'a> UnverifiedManifest<'a> {
    /// Fetch `family`'s manifest.
    pub async fn fetch(ctx: &'a RunContext, family: &'a dyn Family) -> Result<Self, InstallError> {
        let name = family.name();
        let source = family.manifest(&ctx.settings).ok_or_else(|| {
            InstallError::Validation(format!("{name} is not enabled"))
        })?;

        let path = obtain(ctx, &source.uri, filename_from_uri(&source.uri))
            .await
            .stage(name, Stage::DownloadManifest)?;

        Ok(Self {
            family,
            source,
            path,
        })
    }

    /// Check the manifest pin and signature, then parse it.
    ///
    /// A signature the OpenPGP backend reports as unsupported is only
    /// tolerated for families that opt in; it is logged and reported in
    /// `notices`.
    pub async fn verify(
        self,
        ctx: &RunContext,
        notices: &mut Vec<String>,
    ) -> Result<VerifiedManifest<'a>, InstallError> {
        let name = self.family.name();

        if let Some(pin) = &self.source.digest {
            verify_digest(&self.path, pin).stage(name, Stage::VerifyManifest)?;
            info!(family = name, "manifest digest matches pin");
        }

        if ctx.settings.skip_pgp {
            warn!(family = name, "manifest signature check skipped");
        } else {
            match self.check_signature(ctx).await {
                Ok(()) => info!(family = name, "manifest signature verified"),
                Err(InstallError::Verify(e))
                    if e.is_unsupported() && self.family.tolerates_unsupported_signature() =>
                {
                    warn!(family = name, error = %e, "cannot verify manifest signature");
                    notices.push(format!(
                        "The {name} signature error that was logged is expected.\n\n\
                         The validity of the {name} archive has been established by its \
                         manifest digest."
                    ));
                }
                Err(e) => return Err(e).stage(name, Stage::VerifyManifest),
            }
        }

        let manifest = Manifest::load(&self.path).stage(name, Stage::VerifyManifest)?;
        Ok(VerifiedManifest {
            family: self.family,
            source: self.source,
            manifest,
        })
    }

    async fn check_signature(&self, ctx: &RunContext) -> Result<(), InstallError> {
        let key = keys::resolve(self.family.name(), self.source.public_key.as_deref())?;
        let verifier = ctx.caps.verifier.as_ref();

        match self.family.signature() {
            SignatureScheme::Detached => {
                let signature_uri = format!("{}.asc", self.source.uri);
                let signature =
                    obtain(ctx, &signature_uri, filename_from_uri(&signature_uri)).await?;
                verify_detached_signature(verifier, &signature, &self.path, &key)?;
            }
            SignatureScheme::Attached => verify_attached_signature(verifier, &self.path, &key)?,
        }
        Ok(())
    }
}

impl<'a> VerifiedManifest<'a> {
    /// Find the artifact for the target tuple.
    pub fn locate(self, ctx: &RunContext) -> Result<LocatedBundle<'a>, InstallError> {
        let name = self.family.name();
        let tuple = self
            .family
            .artifact_tuple(&ctx.settings.tuple)
            .stage(name, Stage::LocateArtifact)?;
        let entry = self
            .manifest
            .locate(&tuple, &self.family.locate_policy())
            .stage(name, Stage::LocateArtifact)?
            .clone();
        let bundle = self
            .family
            .bundle_dir(&entry.filename)
            .stage(name, Stage::LocateArtifact)?;

        info!(family = name, artifact = %entry.filename, "located artifact");
        Ok(LocatedBundle {
            family: self.family,
            uri: format!("{}{}", base_uri(&self.source.uri), entry.filename),
            entry,
            bundle,
        })
    }
}

impl<'a> LocatedBundle<'a> {
    /// Fetch the archive and check its digest against the manifest.
    pub async fn download(&self, ctx: &RunContext) -> Result<DownloadedBundle, InstallError> {
        let name = self.family.name();
        let archive = obtain(ctx, &self.uri, &self.entry.filename)
            .await
            .stage(name, Stage::DownloadArtifact)?;
        verify_digest(&archive, &self.entry.digest).stage(name, Stage::DownloadArtifact)?;
        info!(family = name, archive = %archive.display(), "artifact digest verified");
        Ok(DownloadedBundle { archive })
    }

    /// Make sure the bundle is extracted below the destination, reusing a
    /// previous extraction of the same archive.
    pub async fn prepare(self, ctx: &RunContext) -> Result<PreparedBundle<'a>, InstallError> {
        let name = self.family.name();
        let cache = ctx.cache();
        let root = cache.bundle_dir(&self.bundle);

        if cache.seen_before(&self.bundle, &self.entry.digest, &self.payload(ctx)) {
            info!(family = name, bundle = %root.display(), "using previously extracted bundle");
            return Ok(PreparedBundle {
                family: self.family,
                root,
            });
        }

        let downloaded = self.download(ctx).await?;

        let archive = downloaded.archive.clone();
        let destination = ctx.settings.destination.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_auto(&archive, &destination))
            .await
            .map_err(|e| InstallError::context("extraction task", e))
            .and_then(|r| r.map_err(InstallError::from))
            .stage(name, Stage::ExtractArtifact)?;
        debug!(family = name, files = extracted.len(), "extracted");

        let missing: Vec<String> = self
            .payload(ctx)
            .iter()
            .filter(|p| !root.join(p).exists())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(InstallError::Validation(format!(
                "{} is missing {} under {}",
                self.entry.filename,
                missing.join(", "),
                self.bundle
            )))
            .stage(name, Stage::ExtractArtifact);
        }
        cache
            .mark_extracted(&self.bundle, &self.entry.digest)
            .stage(name, Stage::ExtractArtifact)?;

        info!(family = name, bundle = %root.display(), "extracted bundle");
        Ok(PreparedBundle {
            family: self.family,
            root,
        })
    }

    /// Paths, relative to the bundle root, an extraction must have produced.
    fn payload(&self, ctx: &RunContext) -> Vec<PathBuf> {
        let bin = Path::new(self.family.binary_dir());
        let catalogue = self.family.catalogue();

        let binaries = catalogue
            .iter()
            .map(|c| bin.join(payload_name(c, &ctx.settings.tuple)));
        let samples = catalogue.iter().filter_map(archived_sample).map(PathBuf::from);
        binaries.chain(samples).collect()
    }
}

fn archived_sample(component: &Component) -> Option<&'static str> {
    match component.config?.sample {
        Sample::Archive(name) => Some(name),
        Sample::Embedded(_) => None,
    }
}

impl<'a> PreparedBundle<'a> {
    /// Classify the family's current installation; refuse partial ones.
    pub fn check(self, ctx: &RunContext) -> Result<CheckedBundle<'a>, InstallError> {
        let name = self.family.name();
        let request = CheckRequest {
            catalogue: self.family.catalogue(),
            destination: &ctx.settings.destination,
            app_dirs: &ctx.app_dirs,
            target: &ctx.settings.tuple,
            runtime: &ctx.settings.runtime,
            allow_running: ctx.settings.allow_running,
            probe: ctx.caps.probe.as_ref(),
        };
        let state = check_preconditions(&request).stage(name, Stage::CheckPreconditions)?;

        match state.binaries() {
            Presence::Complete => {
                info!(family = name, versions = ?state.versions(), "upgrading installed binaries");
            }
            Presence::Nothing => info!(family = name, "fresh install"),
            Presence::Partial => {}
        }

        Ok(CheckedBundle {
            family: self.family,
            root: self.root,
            state,
        })
    }
}

impl CheckedBundle<'_> {
    /// Write missing configs and run the family's post-config hook. Nothing
    /// is written for a foreign tuple.
    pub fn install_configs(
        &self,
        ctx: &RunContext,
        notices: &mut Vec<String>,
    ) -> Result<Vec<PathBuf>, InstallError> {
        let name = self.family.name();
        if ctx.settings.is_foreign() {
            warn!(family = name, "installing for a foreign tuple; skipping configuration");
            return Ok(Vec::new());
        }

        let written = install::install_configs(
            self.family.catalogue(),
            &ctx.app_dirs,
            &self.root,
            |component| self.family.overrides(ctx, component),
        )
        .stage(name, Stage::InstallConfigs)?;

        self.family
            .after_configs(ctx, &self.binary_root(), notices)
            .stage(name, Stage::InstallConfigs)?;
        Ok(written)
    }

    /// Replace the installed binaries with the bundle's.
    pub fn install_binaries(&self, ctx: &RunContext) -> Result<Vec<PathBuf>, InstallError> {
        install::install_binaries(
            self.family.catalogue(),
            &self.binary_root(),
            &ctx.settings.destination,
            &ctx.settings.tuple,
        )
        .stage(self.family.name(), Stage::InstallBinaries)
    }

    fn binary_root(&self) -> PathBuf {
        match self.family.binary_dir() {
            "" => self.root.clone(),
            dir => self.root.join(dir),
        }
    }
}
