//! Component descriptors.
//!
//! Each product family ships a fixed, ordered list of [`Component`]s. The same
//! list drives the liveness probe, the version and config consistency checks,
//! config generation and binary installation.

/// Where a component's sample configuration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// A file inside the extracted release, relative to its root.
    Archive(&'static str),
    /// Text compiled into the installer.
    Embedded(&'static str),
}

/// A component's configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSpec {
    /// File name written into the application directory.
    pub filename: &'static str,
    /// Template the file is rendered from.
    pub sample: Sample,
    /// Application directory name when it differs from the component name.
    pub app_dir: Option<&'static str>,
    /// Use the roaming application directory on Windows.
    pub roaming: bool,
}

impl ConfigSpec {
    /// Config whose sample ships inside the release archive.
    pub const fn archived(filename: &'static str, sample: &'static str) -> Self {
        Self {
            filename,
            sample: Sample::Archive(sample),
            app_dir: None,
            roaming: false,
        }
    }

    /// Config whose sample is compiled in.
    pub const fn embedded(filename: &'static str, sample: &'static str) -> Self {
        Self {
            filename,
            sample: Sample::Embedded(sample),
            app_dir: None,
            roaming: false,
        }
    }

    /// Store the config under a differently named, roaming application directory.
    pub const fn in_roaming_dir(mut self, app_dir: &'static str) -> Self {
        self.app_dir = Some(app_dir);
        self.roaming = true;
        self
    }
}

/// Static metadata for one installed binary or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Binary (or directory) name without platform suffix.
    pub name: &'static str,
    /// Configuration file, if the component has one.
    pub config: Option<ConfigSpec>,
    /// Whether `<name> --version` reports a release version.
    pub supports_version: bool,
    /// Whether the payload is a directory rather than an executable.
    pub directory: bool,
}

impl Component {
    /// An executable that reports its version.
    pub const fn versioned(name: &'static str) -> Self {
        Self {
            name,
            config: None,
            supports_version: true,
            directory: false,
        }
    }

    /// An executable without a version flag.
    pub const fn unversioned(name: &'static str) -> Self {
        Self {
            name,
            config: None,
            supports_version: false,
            directory: false,
        }
    }

    /// A directory payload copied as a whole.
    pub const fn directory(name: &'static str) -> Self {
        Self {
            name,
            config: None,
            supports_version: false,
            directory: true,
        }
    }

    /// Attach a configuration file.
    pub const fn with_config(mut self, config: ConfigSpec) -> Self {
        self.config = Some(config);
        self
    }

    /// Application directory name holding this component's config.
    pub fn app_dir_name(&self) -> &'static str {
        self.config.and_then(|c| c.app_dir).unwrap_or(self.name)
    }
}
