//! dcrinstall - Decred release installer CLI

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use dcrinstall_cli::ops::{self, RunContext, RunReport};
use dcrinstall_cli::{Cli, Settings, VERSION, logging};
use dcrinstall_core::install::create_private_dir;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::from_cli(cli)?;

    create_private_dir(&settings.destination).context("creating destination")?;
    logging::init(settings.verbosity, &settings.log_file())?;

    info!(
        version = VERSION,
        started = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z"),
        tuple = %settings.tuple,
        network = %settings.network,
        destination = %settings.destination.display(),
        "dcrinstall starting"
    );

    let ctx = RunContext::new(settings)?;
    let mut report = RunReport::default();
    let outcome = ops::run_into(&ctx, &mut report).await;

    for notice in &report.notices {
        println!("\n{notice}");
    }
    // Stage errors render their cause inline.
    if let Err(e) = outcome {
        error!("dcrinstall failed: {e}");
        return Ok(ExitCode::FAILURE);
    }

    if ctx.settings.download_only {
        println!(
            "\nVerified downloads are in {}",
            ctx.download_dir().display()
        );
    } else {
        println!(
            "\nInstalled {} files into {}. Extracted bundles are kept there as backups.",
            report.installed.len(),
            ctx.settings.destination.display()
        );
    }

    info!("dcrinstall complete");
    Ok(ExitCode::SUCCESS)
}
