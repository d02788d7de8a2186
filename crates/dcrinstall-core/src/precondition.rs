//! Install-state preconditions.
//!
//! Before anything in the destination is touched, each product family's
//! current state is classified as nothing installed, fully installed, or
//! partially installed. A partial state is never repaired automatically:
//! the run stops and a human decides.
//!
//! The checks, in order:
//!
//! 1. No catalogue binary may be running (skipped for foreign tuples or when
//!    the operator allows it).
//! 2. Either every versioned binary reports a version, or none does.
//! 3. Either every config file exists, or none does (skipped for foreign
//!    tuples, whose configs are never written).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use dcrinstall_schema::{Component, ReleaseVersion, Tuple, VersionError};
use thiserror::Error;
use tracing::{info, warn};

use crate::install::config_path;
use crate::paths::AppDirs;
use crate::process::{ProbeError, ProcessProbe};

const HUMAN_INTERVENTION: &str = "This is to prevent improper installations or upgrades. \
This upgrade/install requires human intervention.";

#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("could not determine whether {name} is running: {source}")]
    Probe {
        name: String,
        #[source]
        source: ProbeError,
    },

    #[error("{} must be stopped before installing", names.join(", "))]
    Running { names: Vec<String> },

    #[error("invalid version reported by {}: {source}", binary.display())]
    Version {
        binary: PathBuf,
        #[source]
        source: VersionError,
    },

    #[error(
        "all or none of the binary files must be installed. {}\n\n{}",
        HUMAN_INTERVENTION,
        listing(installed, missing)
    )]
    PartialBinaries {
        installed: Vec<PathBuf>,
        missing: Vec<PathBuf>,
    },

    #[error(
        "all or none of the configuration files must be installed. {}\n\n{}",
        HUMAN_INTERVENTION,
        listing(installed, missing)
    )]
    PartialConfigs {
        installed: Vec<PathBuf>,
        missing: Vec<PathBuf>,
    },
}

fn listing(installed: &[PathBuf], missing: &[PathBuf]) -> String {
    let mut out = String::from("Installed:\n");
    for path in installed {
        let _ = writeln!(out, "  {}", path.display());
    }
    out.push_str("Not installed:\n");
    for path in missing {
        let _ = writeln!(out, "  {}", path.display());
    }
    out
}

/// Inputs to [`check_preconditions`].
#[derive(Clone, Copy)]
pub struct CheckRequest<'a> {
    pub catalogue: &'a [Component],
    pub destination: &'a Path,
    pub app_dirs: &'a AppDirs,
    /// Tuple being installed.
    pub target: &'a Tuple,
    /// Tuple of this machine.
    pub runtime: &'a Tuple,
    pub allow_running: bool,
    pub probe: &'a dyn ProcessProbe,
}

impl std::fmt::Debug for CheckRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRequest")
            .field("destination", &self.destination)
            .field("target", &self.target)
            .field("runtime", &self.runtime)
            .field("allow_running", &self.allow_running)
            .finish_non_exhaustive()
    }
}

/// How much of a family is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Nothing,
    Complete,
    Partial,
}

impl Presence {
    fn classify(found: usize, expected: usize) -> Self {
        if found == 0 {
            Self::Nothing
        } else if found == expected {
            Self::Complete
        } else {
            Self::Partial
        }
    }
}

/// A family's observed install state.
#[derive(Debug, Clone, Default)]
pub struct InstallState {
    /// Versioned binaries found, with what they reported.
    pub installed: Vec<(PathBuf, ReleaseVersion)>,
    /// Versioned binaries that could not be run.
    pub not_installed: Vec<PathBuf>,
    /// Config files already present.
    pub installed_configs: Vec<PathBuf>,
    /// Config files absent.
    pub missing_configs: Vec<PathBuf>,
}

impl InstallState {
    pub fn binaries(&self) -> Presence {
        Presence::classify(
            self.installed.len(),
            self.installed.len() + self.not_installed.len(),
        )
    }

    pub fn configs(&self) -> Presence {
        Presence::classify(
            self.installed_configs.len(),
            self.installed_configs.len() + self.missing_configs.len(),
        )
    }

    /// Installed versions mapped to the binaries reporting them.
    pub fn versions(&self) -> BTreeMap<String, Vec<String>> {
        let mut versions: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (path, version) in &self.installed {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            versions.entry(version.to_string()).or_default().push(name);
        }
        versions
    }
}

/// Classify a family's install state, failing on anything that is not safe
/// to overwrite.
///
/// # Errors
///
/// [`PreconditionError::Running`] when catalogue processes are alive,
/// [`PreconditionError::PartialBinaries`] or
/// [`PreconditionError::PartialConfigs`] for partial installs, and probe or
/// version parse failures.
pub fn check_preconditions(req: &CheckRequest<'_>) -> Result<InstallState, PreconditionError> {
    let foreign = req.target != req.runtime;

    if foreign {
        warn!(
            target_tuple = %req.target,
            runtime = %req.runtime,
            "installing for a foreign tuple; skipping running process check"
        );
    } else if req.allow_running {
        warn!("running process check disabled by operator");
    } else {
        check_not_running(req)?;
    }

    let mut state = InstallState::default();

    for component in req.catalogue.iter().filter(|c| c.supports_version) {
        let binary = req.destination.join(req.target.executable(component.name));
        match req.probe.installed_version(&binary) {
            Ok(Some(version)) => {
                info!(component = component.name, %version, "installed");
                state.installed.push((binary, version));
            }
            Ok(None) => {
                info!(component = component.name, "not installed");
                state.not_installed.push(binary);
            }
            Err(source) => return Err(PreconditionError::Version { binary, source }),
        }
    }

    if state.binaries() == Presence::Partial {
        return Err(PreconditionError::PartialBinaries {
            installed: state.installed.iter().map(|(p, _)| p.clone()).collect(),
            missing: state.not_installed,
        });
    }

    let versions = state.versions();
    if versions.len() > 1 {
        warn!(?versions, "installed binaries report different versions");
    }

    if foreign {
        warn!("installing for a foreign tuple; skipping config file check");
    } else {
        for component in req.catalogue {
            let Some(path) = config_path(req.app_dirs, component) else {
                continue;
            };
            if path.exists() {
                info!(path = %path.display(), "config already installed");
                state.installed_configs.push(path);
            } else {
                info!(path = %path.display(), "config not installed");
                state.missing_configs.push(path);
            }
        }

        if state.configs() == Presence::Partial {
            return Err(PreconditionError::PartialConfigs {
                installed: state.installed_configs,
                missing: state.missing_configs,
            });
        }
    }

    Ok(state)
}

fn check_not_running(req: &CheckRequest<'_>) -> Result<(), PreconditionError> {
    let mut running = Vec::new();
    for component in req.catalogue.iter().filter(|c| !c.directory) {
        let alive = req
            .probe
            .is_running(component.name)
            .map_err(|source| PreconditionError::Probe {
                name: component.name.to_string(),
                source,
            })?;
        if alive {
            warn!(component = component.name, "still running");
            running.push(component.name.to_string());
        }
    }

    if running.is_empty() {
        Ok(())
    } else {
        Err(PreconditionError::Running { names: running })
    }
}
