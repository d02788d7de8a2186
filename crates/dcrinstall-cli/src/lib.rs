//! dcrinstall - Decred release installer
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Downloads, verifies and installs the Decred release bundle, and optionally
//! the dcrdex exchange client and a bitcoin node, into a single destination.
//!
//! # Architecture
//!
//! - **Families**: each product family is a static component catalogue plus a
//!   handful of hooks (`family::Family`). One generic pipeline drives all three.
//! - **Typestate Pattern**: a bundle moves through `UnverifiedManifest` →
//!   `VerifiedManifest` → `LocatedBundle` → `PreparedBundle` → `CheckedBundle`,
//!   so nothing is installed that was not verified and precondition-checked.
//! - **Run context**: settings, generated credentials and the side-effecting
//!   capabilities are bundled once into `ops::RunContext`.
//!
//! # Directory Layout
//!
//! ```text
//! ~/decred/
//! ├── dcrd, dcrwallet, ...            # Installed binaries
//! ├── decred-linux-amd64-v1.7.0/      # Extracted bundle (kept as backup)
//! └── dcrinstall.log                  # Run log
//! ```

pub mod family;
pub mod keys;
pub mod logging;
pub mod ops;
pub mod settings;

pub use settings::{ManifestSource, Settings, SettingsError, Verbosity};

use clap::Parser;
use dcrinstall_schema::{Network, Sha256Digest, Tuple};
use std::path::PathBuf;

/// Version string derived from `git describe` at build time.
pub const VERSION: &str = env!("DCRINSTALL_VERSION");

pub const DEFAULT_DECRED_MANIFEST: &str = "https://github.com/decred/decred-binaries/releases/download/v1.7.0/decred-v1.7.0-manifest.txt";
pub const DEFAULT_DCRDEX_MANIFEST: &str =
    "https://github.com/decred/dcrdex/releases/download/v0.4.0/dexc-v0.4.0-manifest.txt";
pub const DEFAULT_BITCOIN_MANIFEST: &str =
    "https://bitcoincore.org/bin/bitcoin-core-0.20.1/SHA256SUMS.asc";

#[derive(Debug, Parser)]
#[command(name = "dcrinstall")]
#[command(author, version = VERSION, about = "dcrinstall - install and upgrade Decred binaries")]
pub struct Cli {
    /// Installation directory
    #[arg(long, env = "DCRINSTALL_DEST", value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Platform to install for, e.g. linux-amd64
    #[arg(long, env = "DCRINSTALL_TUPLE", value_name = "OS-ARCH")]
    pub tuple: Option<Tuple>,

    /// Network new configs are written for
    #[arg(long, env = "DCRINSTALL_NET", default_value_t = Network::Mainnet)]
    pub net: Network,

    /// Do not verify manifest signatures
    #[arg(long, env = "DCRINSTALL_SKIP_PGP")]
    pub skip_pgp: bool,

    /// Download and extract bundles even when already extracted
    #[arg(long, env = "DCRINSTALL_FORCE_DOWNLOAD")]
    pub force_download: bool,

    /// Install even when a managed daemon is running
    #[arg(long, env = "DCRINSTALL_ALLOW_RUNNING")]
    pub allow_running: bool,

    /// Fetch and verify bundles but do not install them
    #[arg(long, env = "DCRINSTALL_DOWNLOAD_ONLY", conflicts_with = "skip_download")]
    pub download_only: bool,

    /// Use manifests and archives already present in --path
    #[arg(long, env = "DCRINSTALL_SKIP_DOWNLOAD", requires = "path")]
    pub skip_download: bool,

    /// Directory downloads are read from (--skip-download) or kept in
    #[arg(long, env = "DCRINSTALL_PATH", value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Only log warnings and errors to the terminal
    #[arg(short, long, env = "DCRINSTALL_QUIET", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug output to the terminal
    #[arg(short, long, env = "DCRINSTALL_VERBOSE")]
    pub verbose: bool,

    /// Do not install the Decred suite
    #[arg(long, env = "DCRINSTALL_SKIP_DECRED")]
    pub skip_decred: bool,

    /// Install the dcrdex exchange client
    #[arg(long, env = "DCRINSTALL_DCRDEX")]
    pub dcrdex: bool,

    /// Install a bitcoin node
    #[arg(long, env = "DCRINSTALL_BITCOIN")]
    pub bitcoin: bool,

    /// Decred manifest URI
    #[arg(long, env = "DCRINSTALL_DECRED_MANIFEST", value_name = "URI", default_value = DEFAULT_DECRED_MANIFEST)]
    pub decred_manifest: String,

    /// Expected SHA256 of the Decred manifest
    #[arg(long, env = "DCRINSTALL_DECRED_MANIFEST_DIGEST", value_name = "HEX")]
    pub decred_manifest_digest: Option<Sha256Digest>,

    /// Armored public key used instead of the built-in Decred key
    #[arg(long, env = "DCRINSTALL_DECRED_PUBKEY", value_name = "FILE")]
    pub decred_pubkey: Option<PathBuf>,

    /// dcrdex manifest URI
    #[arg(long, env = "DCRINSTALL_DCRDEX_MANIFEST", value_name = "URI", default_value = DEFAULT_DCRDEX_MANIFEST)]
    pub dcrdex_manifest: String,

    /// Expected SHA256 of the dcrdex manifest
    #[arg(long, env = "DCRINSTALL_DCRDEX_MANIFEST_DIGEST", value_name = "HEX")]
    pub dcrdex_manifest_digest: Option<Sha256Digest>,

    /// Armored public key used instead of the built-in dcrdex key
    #[arg(long, env = "DCRINSTALL_DCRDEX_PUBKEY", value_name = "FILE")]
    pub dcrdex_pubkey: Option<PathBuf>,

    /// Bitcoin manifest URI
    #[arg(long, env = "DCRINSTALL_BITCOIN_MANIFEST", value_name = "URI", default_value = DEFAULT_BITCOIN_MANIFEST)]
    pub bitcoin_manifest: String,

    /// Expected SHA256 of the bitcoin manifest
    #[arg(long, env = "DCRINSTALL_BITCOIN_MANIFEST_DIGEST", value_name = "HEX")]
    pub bitcoin_manifest_digest: Option<Sha256Digest>,

    /// Armored public key used instead of the built-in bitcoin key
    #[arg(long, env = "DCRINSTALL_BITCOIN_PUBKEY", value_name = "FILE")]
    pub bitcoin_pubkey: Option<PathBuf>,
}
