//! Post-config provisioning that shells out to freshly extracted tools.
//!
//! Client certificates come from the bundle's `gencerts`; wallet creation runs
//! `dcrwallet --create`, which prompts for a passphrase and seed on the
//! operator's terminal.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use dcrinstall_schema::Network;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {status}", program.display())]
    Exit {
        program: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// Tools the installer runs on the operator's behalf.
pub trait Provisioner: Send + Sync {
    /// Write a TLS client certificate and key using `gencerts`.
    fn generate_client_cert(
        &self,
        gencerts: &Path,
        cert: &Path,
        key: &Path,
    ) -> Result<(), ProvisionError>;

    /// Create a wallet on `network`. Interactive.
    fn create_wallet(&self, dcrwallet: &Path, network: Network) -> Result<(), ProvisionError>;
}

/// Runs the real binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessProvisioner;

impl ProcessProvisioner {
    fn run(program: &Path, command: &mut Command) -> Result<(), ProvisionError> {
        debug!(?command, "running");
        let status = command.status().map_err(|source| ProvisionError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(ProvisionError::Exit {
                program: program.to_path_buf(),
                status,
            })
        }
    }
}

impl Provisioner for ProcessProvisioner {
    fn generate_client_cert(
        &self,
        gencerts: &Path,
        cert: &Path,
        key: &Path,
    ) -> Result<(), ProvisionError> {
        info!(cert = %cert.display(), "generating client certificate");
        Self::run(
            gencerts,
            Command::new(gencerts)
                .arg(cert)
                .arg(key)
                .stdin(Stdio::null()),
        )
    }

    fn create_wallet(&self, dcrwallet: &Path, network: Network) -> Result<(), ProvisionError> {
        info!(%network, "creating wallet");
        let mut command = Command::new(dcrwallet);
        command.arg("--create");
        match network {
            Network::Mainnet => {}
            Network::Testnet => {
                command.arg("--testnet");
            }
            Network::Simnet => {
                command.arg("--simnet");
            }
        }
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        Self::run(dcrwallet, &mut command)
    }
}
