//! Terminal and run-log output.
//!
//! Everything goes through `tracing`. The terminal layer honours `RUST_LOG`
//! and the quiet/verbose switches; the file layer always records at least
//! `info` into `<destination>/dcrinstall.log`.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::settings::Verbosity;

/// Install the global subscriber. `log_file` is opened for appending; its
/// parent directory must already exist.
pub fn init(verbosity: Verbosity, log_file: &Path) -> Result<()> {
    let file = open_log(log_file)?;

    let terminal_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    let file_filter = EnvFilter::new(match verbosity {
        Verbosity::Verbose => "debug",
        Verbosity::Quiet | Verbosity::Normal => "info",
    });

    let terminal = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(terminal_filter);

    let logfile = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(terminal)
        .with(logfile)
        .try_init()
        .context("installing log subscriber")?;
    Ok(())
}

fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
