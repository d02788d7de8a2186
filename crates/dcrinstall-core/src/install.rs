//! Bundle installation.
//!
//! Configs are rendered into per-application directories; binaries are copied
//! from the extracted, versioned bundle into the flat destination root. Trust
//! in the new files was established by signature and digest checks earlier,
//! so existing files are replaced without backup.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dcrinstall_schema::{Component, Sample, Tuple};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::paths::AppDirs;
use crate::template::{self, Override};

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("{}: file not found", path.display())]
    MissingSource { path: PathBuf },

    #[error("failed to read sample config {}: {source}", path.display())]
    Sample {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove previous {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}: {message}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
}

/// Where `component`'s config lives, if it has one.
pub fn config_path(app_dirs: &AppDirs, component: &Component) -> Option<PathBuf> {
    let spec = component.config?;
    Some(
        app_dirs
            .app_data_dir(component.app_dir_name(), spec.roaming)
            .join(spec.filename),
    )
}

/// File name of `component` inside a bundle and the destination.
pub fn payload_name(component: &Component, target: &Tuple) -> String {
    if component.directory {
        component.name.to_string()
    } else {
        target.executable(component.name)
    }
}

/// Write a config for every component that has one and does not already have
/// a file in place. Returns the paths written.
///
/// Archive samples are read relative to `sample_root`.
///
/// # Errors
///
/// Any failure reading a sample or writing a config.
pub fn install_configs<F>(
    catalogue: &[Component],
    app_dirs: &AppDirs,
    sample_root: &Path,
    overrides: F,
) -> Result<Vec<PathBuf>, BundleError>
where
    F: Fn(&Component) -> Vec<Override>,
{
    let mut written = Vec::new();

    for component in catalogue {
        let (Some(spec), Some(dst)) = (component.config, config_path(app_dirs, component)) else {
            continue;
        };

        if dst.exists() {
            debug!(path = %dst.display(), "config already present");
            continue;
        }

        let sample = match spec.sample {
            Sample::Embedded(text) => text.to_string(),
            Sample::Archive(name) => {
                let path = sample_root.join(name);
                fs::read_to_string(&path).map_err(|source| BundleError::Sample { path, source })?
            }
        };

        let rendered = template::render(&sample, &overrides(component));
        if let Some(dir) = dst.parent() {
            create_private_dir(dir)?;
        }
        write_private(&dst, rendered.as_bytes())?;

        info!(component = component.name, path = %dst.display(), "installed config");
        written.push(dst);
    }

    Ok(written)
}

/// Copy every catalogue payload from `source_dir` into `destination`.
/// Returns the installed paths.
///
/// # Errors
///
/// [`BundleError::MissingSource`] when the bundle lacks an expected file,
/// and any failure removing or copying files.
pub fn install_binaries(
    catalogue: &[Component],
    source_dir: &Path,
    destination: &Path,
    target: &Tuple,
) -> Result<Vec<PathBuf>, BundleError> {
    fs::create_dir_all(destination).map_err(|source| BundleError::CreateDir {
        path: destination.to_path_buf(),
        source,
    })?;

    // Every source must be present before the first destination file goes.
    let mut plan = Vec::with_capacity(catalogue.len());
    for component in catalogue {
        let name = payload_name(component, target);
        let src = source_dir.join(&name);
        if !src.exists() {
            return Err(BundleError::MissingSource { path: src });
        }
        plan.push((component, src, destination.join(&name)));
    }

    let mut installed = Vec::with_capacity(plan.len());
    for (component, src, dst) in plan {
        remove_existing(&dst)?;

        if component.directory {
            copy_dir(&src, &dst)?;
        } else {
            fs::copy(&src, &dst).map_err(|e| BundleError::Copy {
                from: src.clone(),
                to: dst.clone(),
                message: e.to_string(),
            })?;
            if let Err(e) = make_executable(&dst) {
                warn!(path = %dst.display(), error = %e, "could not mark executable");
            }
        }

        info!(component = component.name, path = %dst.display(), "installed");
        installed.push(dst);
    }

    Ok(installed)
}

fn remove_existing(path: &Path) -> Result<(), BundleError> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|source| BundleError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<(), BundleError> {
    fs::create_dir_all(dst).map_err(|source| BundleError::CreateDir {
        path: dst.to_path_buf(),
        source,
    })?;
    fs_extra::dir::copy(
        src,
        dst,
        &fs_extra::dir::CopyOptions::new()
            .content_only(true)
            .overwrite(true),
    )
    .map_err(|e| BundleError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Create `dir` (and parents), restricting it to the owner on Unix.
///
/// # Errors
///
/// [`BundleError::CreateDir`] on failure.
pub fn create_private_dir(dir: &Path) -> Result<(), BundleError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|source| BundleError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_private(path: &Path, contents: &[u8]) -> Result<(), BundleError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write_err = |source| BundleError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = options.open(path).map_err(write_err)?;
    file.write_all(contents).map_err(write_err)?;
    file.sync_all().map_err(write_err)
}
