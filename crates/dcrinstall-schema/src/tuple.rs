//! Platform tuples.
//!
//! A tuple is the `os-arch` pair release artifacts are named after, using Go
//! naming (`darwin`, `amd64`) rather than Rust's (`macos`, `x86_64`).
//!
//! # Example
//!
//! ```
//! use dcrinstall_schema::Tuple;
//!
//! let tuple: Tuple = "linux-amd64".parse().unwrap();
//! assert_eq!(tuple.os(), "linux");
//! assert_eq!(tuple.executable("dcrd"), "dcrd");
//! ```

use thiserror::Error;

/// Rejected tuple text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid platform tuple '{0}': expected os-arch, e.g. linux-amd64")]
pub struct TupleError(pub String);

/// An `os-arch` platform identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    os: String,
    arch: String,
}

impl Tuple {
    /// Build a tuple from already-normalised parts.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The tuple of the machine this binary is running on.
    pub fn current() -> Self {
        Self::new(
            os_name(std::env::consts::OS),
            arch_name(std::env::consts::ARCH),
        )
    }

    /// Operating system half (`linux`, `darwin`, `windows`, ...).
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Architecture half (`amd64`, `arm64`, `arm`, `386`, ...).
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Returns `true` for Windows targets, whose executables carry `.exe`.
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// File name of executable `name` on this platform.
    pub fn executable(&self, name: &str) -> String {
        if self.is_windows() {
            format!("{name}.exe")
        } else {
            name.to_string()
        }
    }
}

fn os_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

impl std::fmt::Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl std::str::FromStr for Tuple {
    type Err = TupleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.split_once('-') {
            Some((os, arch))
                if !os.is_empty() && !arch.is_empty() && !arch.contains('-') =>
            {
                Ok(Self::new(os, arch))
            }
            _ => Err(TupleError(s.to_string())),
        }
    }
}
