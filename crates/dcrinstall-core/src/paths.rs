//! Per-application data directories.
//!
//! Daemons read their config from a platform-conventional directory:
//!
//! | platform | location                                   |
//! |----------|--------------------------------------------|
//! | Unix     | `~/.dcrd`                                  |
//! | macOS    | `~/Library/Application Support/Dcrd`       |
//! | Windows  | `%LOCALAPPDATA%\Dcrd` (`%APPDATA%` roaming) |

use std::path::PathBuf;

use dirs::home_dir;

/// Resolves application directories relative to a home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    home: PathBuf,
    local: Option<PathBuf>,
    roaming: Option<PathBuf>,
}

impl AppDirs {
    /// Directories of the current user, or `None` if no home can be resolved.
    pub fn from_env() -> Option<Self> {
        let home = home_dir()?;
        Some(Self {
            home,
            local: dirs::data_local_dir(),
            roaming: dirs::data_dir(),
        })
    }

    /// Directories rooted at an explicit home. On Windows the local and
    /// roaming roots become `AppData\Local` and `AppData\Roaming` below it.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            local: Some(home.join("AppData").join("Local")),
            roaming: Some(home.join("AppData").join("Roaming")),
            home,
        }
    }

    /// Data directory for application `name`.
    pub fn app_data_dir(&self, name: &str, roaming: bool) -> PathBuf {
        let name = name.trim_start_matches('.');
        if name.is_empty() {
            return PathBuf::from(".");
        }

        if cfg!(windows) {
            let root = if roaming { &self.roaming } else { &self.local };
            root.clone()
                .unwrap_or_else(|| self.home.clone())
                .join(capitalized(name))
        } else if cfg!(target_os = "macos") {
            self.home
                .join("Library")
                .join("Application Support")
                .join(capitalized(name))
        } else {
            self.home.join(format!(".{}", name.to_lowercase()))
        }
    }
}

fn capitalized(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
