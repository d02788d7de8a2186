//! Shared types for dcrinstall.
//!
//! Everything in this crate is pure data: platform tuples, digests, release
//! versions, the signed manifest format and the static component catalogues
//! that drive every install loop. Side effects live in `dcrinstall-core`.

pub mod catalogue;
pub mod hash;
pub mod manifest;
pub mod tuple;
pub mod types;
pub mod version;

// Re-exports
pub use catalogue::{Component, ConfigSpec, Sample};
pub use hash::*;
pub use manifest::{Exclusion, LocatePolicy, Manifest, ManifestEntry, ManifestError};
pub use tuple::*;
pub use types::*;
pub use version::{ReleaseVersion, VersionError};
