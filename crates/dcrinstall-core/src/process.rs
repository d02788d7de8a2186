//! Process probes.
//!
//! Before binaries are replaced the installer needs to know whether any of
//! them is running and which version is currently installed. Both questions
//! go through [`ProcessProbe`] so tests can answer them without real daemons.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use dcrinstall_schema::{ReleaseVersion, VersionError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("process listing tool not found: {0}")]
    MissingTool(#[from] which::Error),

    #[error("failed to probe processes: {0}")]
    Io(#[from] io::Error),

    #[error("process listing failed: {0}")]
    Failed(String),

    #[error("invalid process name {0:?}")]
    InvalidName(String),
}

/// Liveness and version queries against installed binaries.
pub trait ProcessProbe: Send + Sync {
    /// Whether a process called `name` is currently running.
    fn is_running(&self, name: &str) -> Result<bool, ProbeError>;

    /// Version reported by `binary --version`, or `None` when the binary is
    /// absent or cannot be executed.
    fn installed_version(&self, binary: &Path) -> Result<Option<ReleaseVersion>, VersionError> {
        query_version(binary)
    }
}

/// Run `binary --version` and extract the release version from its output.
///
/// # Errors
///
/// The binary ran but printed no semantic version.
pub fn query_version(binary: &Path) -> Result<Option<ReleaseVersion>, VersionError> {
    let output = match Command::new(binary).arg("--version").output() {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!(binary = %binary.display(), status = %output.status, "version probe failed");
            return Ok(None);
        }
        Err(e) => {
            debug!(binary = %binary.display(), error = %e, "version probe could not start");
            return Ok(None);
        }
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    ReleaseVersion::extract(text.trim()).map(Some)
}

/// The host's [`ProcessProbe`].
///
/// Unix lists processes with `ps`. Windows has no portable process listing
/// without FFI, so a binary counts as running when its installed executable
/// cannot be opened for writing because another process holds it.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    #[cfg_attr(unix, allow(dead_code))]
    destination: PathBuf,
}

impl SystemProbe {
    /// Probe for binaries installed in `destination`.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl ProcessProbe for SystemProbe {
    #[cfg(unix)]
    fn is_running(&self, name: &str) -> Result<bool, ProbeError> {
        let ps = which::which("ps")?;
        let args: &[&str] = if cfg!(target_os = "linux") {
            &["-Aaww"]
        } else {
            &["Aaww"]
        };

        let output = Command::new(ps).args(args).output()?;
        if !output.status.success() {
            return Err(ProbeError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        listing_mentions(&listing, name)
    }

    #[cfg(not(unix))]
    fn is_running(&self, name: &str) -> Result<bool, ProbeError> {
        const ERROR_SHARING_VIOLATION: i32 = 32;

        let path = self.destination.join(format!("{name}.exe"));
        match std::fs::OpenOptions::new().append(true).open(&path) {
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) if e.raw_os_error() == Some(ERROR_SHARING_VIOLATION) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether any line of a process listing names `name` as a whole word.
fn listing_mentions(listing: &str, name: &str) -> Result<bool, ProbeError> {
    let pattern = format!(r"(?:^|\W){}(?:$|\W)", regex::escape(name));
    let re = regex::Regex::new(&pattern).map_err(|_| ProbeError::InvalidName(name.to_string()))?;
    Ok(listing.lines().any(|line| re.is_match(line)))
}
