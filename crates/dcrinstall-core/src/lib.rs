//! Core engine for dcrinstall.
//!
//! Side-effecting capabilities (fetch, extraction, signature checks, process
//! probes) sit behind small traits or free functions so the orchestrator can
//! be exercised with fakes. The generic precondition checker and bundle
//! installer are driven entirely by a family's component catalogue.

pub mod cache;
pub mod install;
pub mod io;
pub mod paths;
pub mod precondition;
pub mod process;
pub mod provision;
pub mod template;
pub mod verify;

pub use cache::ArtifactCache;
pub use io::fetch::{FetchError, Fetcher, HttpFetcher};
pub use paths::AppDirs;
pub use process::{ProcessProbe, SystemProbe};
pub use provision::{ProcessProvisioner, Provisioner};
pub use verify::{PgpVerifier, SignatureVerifier, VerifyError};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("dcrinstall/", env!("CARGO_PKG_VERSION"));
