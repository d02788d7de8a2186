//! Install orchestrator.
//!
//! Every enabled family is fetched, verified, extracted and
//! precondition-checked before any of them writes a config or a binary. A
//! failure anywhere aborts the run without rollback; the all-or-nothing
//! preconditions make the next invocation safe.

use std::path::PathBuf;

use tracing::info;

use crate::family::{self, Family};
use crate::ops::flow::{LocatedBundle, UnverifiedManifest};
use crate::ops::{InstallError, RunContext};

/// What a run did. After a failure it holds whatever was done up to that point.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Messages for the operator, in family order.
    pub notices: Vec<String>,
    /// Verified archives kept by a download-only run.
    pub downloads: Vec<PathBuf>,
    /// Config files written.
    pub configs: Vec<PathBuf>,
    /// Binaries and directories installed into the destination.
    pub installed: Vec<PathBuf>,
}

async fn locate<'a>(
    ctx: &'a RunContext,
    family: &'a dyn Family,
    notices: &mut Vec<String>,
) -> Result<LocatedBundle<'a>, InstallError> {
    UnverifiedManifest::fetch(ctx, family)
        .await?
        .verify(ctx, notices)
        .await?
        .locate(ctx)
}

/// Run the whole installation described by `ctx`.
pub async fn run(ctx: &RunContext) -> Result<RunReport, InstallError> {
    let mut report = RunReport::default();
    run_into(ctx, &mut report).await?;
    Ok(report)
}

/// [`run`], recording progress into `report` so notices raised before a
/// failure still reach the operator.
pub async fn run_into(ctx: &RunContext, report: &mut RunReport) -> Result<(), InstallError> {
    let families = family::enabled(&ctx.settings);

    if ctx.settings.download_only {
        for family in &families {
            let located = locate(ctx, family.as_ref(), &mut report.notices).await?;
            let downloaded = located.download(ctx).await?;
            report.downloads.push(downloaded.archive);
        }
        info!(dir = %ctx.download_dir().display(), "download complete; nothing installed");
        return Ok(());
    }

    let mut checked = Vec::with_capacity(families.len());
    for family in &families {
        let located = locate(ctx, family.as_ref(), &mut report.notices).await?;
        let prepared = located.prepare(ctx).await?;
        checked.push(prepared.check(ctx)?);
    }

    for bundle in &checked {
        let written = bundle.install_configs(ctx, &mut report.notices)?;
        report.configs.extend(written);
    }

    for (bundle, family) in checked.iter().zip(&families) {
        let installed = bundle.install_binaries(ctx)?;
        info!(family = family.name(), count = installed.len(), "installed");
        report.installed.extend(installed);
        report.notices.extend(family.notices(ctx));
    }

    Ok(())
}
