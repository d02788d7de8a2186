//! Small value types shared across crates.

use thiserror::Error;

/// Rejected network name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown network '{0}': expected mainnet, testnet or simnet")]
pub struct NetworkError(pub String);

/// The chain a fresh installation is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network.
    Testnet,
    /// Private simulation network.
    Simnet,
}

impl Network {
    /// Name as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Simnet => "simnet",
        }
    }

    /// Data directory name the Decred daemons use for this network.
    pub fn data_dir_name(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet3",
            Self::Simnet => "simnet",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" | "testnet3" => Ok(Self::Testnet),
            "simnet" => Ok(Self::Simnet),
            _ => Err(NetworkError(s.to_string())),
        }
    }
}
