//! Product families.
//!
//! A family is a fixed component catalogue plus the few places its releases
//! differ from one another: how the manifest is signed, how artifacts are
//! named, which config lines get generated values, and what happens after
//! configs are written. Everything else is shared by `ops::flow`.

mod bitcoin;
mod dcrdex;
mod decred;

pub use bitcoin::Bitcoin;
pub use dcrdex::Dcrdex;
pub use decred::Decred;

use std::path::Path;

use dcrinstall_core::io::extract::archive_stem;
use dcrinstall_core::template::Override;
use dcrinstall_schema::{Component, Exclusion, LocatePolicy, Network, Tuple};

use crate::ops::{InstallError, RunContext};
use crate::settings::{ManifestSource, Settings};

/// How a family's manifest carries its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Separate `<manifest>.asc` file.
    Detached,
    /// Clear-signed manifest.
    Attached,
}

const TARBALLS_ONLY: &[Exclusion] = &[Exclusion::Extension("zip")];

/// One installable product family.
pub trait Family: Send + Sync {
    fn name(&self) -> &'static str;

    fn catalogue(&self) -> &'static [Component];

    /// Manifest settings, `None` when the family is disabled.
    fn manifest<'a>(&self, settings: &'a Settings) -> Option<&'a ManifestSource>;

    fn signature(&self) -> SignatureScheme {
        SignatureScheme::Detached
    }

    /// Whether a signature the OpenPGP backend cannot evaluate is downgraded
    /// to a warning. Artifact digests are still enforced.
    fn tolerates_unsupported_signature(&self) -> bool {
        false
    }

    /// Tuple spelling used in this family's artifact names.
    fn artifact_tuple(&self, target: &Tuple) -> Result<String, InstallError> {
        Ok(target.to_string())
    }

    fn locate_policy(&self) -> LocatePolicy {
        LocatePolicy {
            separator: Some('-'),
            exclusions: TARBALLS_ONLY,
        }
    }

    /// Directory the archive `filename` extracts to, relative to the
    /// destination.
    fn bundle_dir(&self, filename: &str) -> Result<String, InstallError> {
        Ok(archive_stem(filename).to_string())
    }

    /// Where the catalogue payloads live inside the bundle directory.
    fn binary_dir(&self) -> &'static str {
        ""
    }

    /// Config lines to activate for `component`.
    fn overrides(&self, ctx: &RunContext, component: &Component) -> Vec<Override>;

    /// Runs after configs are written and before binaries are copied.
    /// `bundle` is the extracted bundle directory.
    fn after_configs(
        &self,
        _ctx: &RunContext,
        _bundle: &Path,
        _notices: &mut Vec<String>,
    ) -> Result<(), InstallError> {
        Ok(())
    }

    /// Messages shown once the family is installed.
    fn notices(&self, _ctx: &RunContext) -> Vec<String> {
        Vec::new()
    }
}

impl std::fmt::Debug for dyn Family + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Families enabled by `settings`, in installation order.
pub fn enabled(settings: &Settings) -> Vec<Box<dyn Family>> {
    let all: [Box<dyn Family>; 3] = [Box::new(Decred), Box::new(Dcrdex), Box::new(Bitcoin)];
    all.into_iter()
        .filter(|family| family.manifest(settings).is_some())
        .collect()
}

/// `; testnet=1` style switch for the Decred-derived daemons.
fn network_override(network: Network) -> Option<Override> {
    match network {
        Network::Mainnet => None,
        Network::Testnet => Some(Override::new("; testnet=", "1")),
        Network::Simnet => Some(Override::new("; simnet=", "1")),
    }
}
