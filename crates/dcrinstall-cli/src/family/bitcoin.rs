//! Bitcoin Core, used by dcrdex for BTC markets.
//!
//! Upstream names artifacts with its own platform spellings and publishes a
//! clear-signed `SHA256SUMS.asc`, so this family overrides most hooks.

use std::sync::LazyLock;

use dcrinstall_core::template::Override;
use dcrinstall_schema::{Component, ConfigSpec, Exclusion, LocatePolicy, Network, Tuple};
use regex::Regex;

use super::{Family, SignatureScheme};
use crate::ops::{InstallError, RunContext};
use crate::settings::{ManifestSource, Settings};

const BITCOIN_SAMPLE: &str = include_str!("../../samples/bitcoin.conf");

const CATALOGUE: &[Component] = &[
    Component::versioned("bitcoin-cli"),
    Component::versioned("bitcoind")
        .with_config(ConfigSpec::embedded("bitcoin.conf", BITCOIN_SAMPLE).in_roaming_dir("bitcoin")),
];

const ALIASES: &[(&str, &str)] = &[
    ("darwin-amd64", "osx64"),
    ("windows-amd64", "win64"),
    ("linux-amd64", "x86_64-linux-gnu"),
    ("linux-arm", "arm-linux-gnueabihf"),
    ("linux-arm64", "aarch64-linux-gnu"),
];

// Windows setup executables, macOS disk images and debug symbol bundles.
const EXCLUSIONS: &[Exclusion] = &[
    Exclusion::Extension("exe"),
    Exclusion::Extension("dmg"),
    Exclusion::Contains("-debug"),
];

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").expect("bitcoin version pattern compiles"));

#[derive(Debug, Clone, Copy)]
pub struct Bitcoin;

impl Family for Bitcoin {
    fn name(&self) -> &'static str {
        "bitcoin"
    }

    fn catalogue(&self) -> &'static [Component] {
        CATALOGUE
    }

    fn manifest<'a>(&self, settings: &'a Settings) -> Option<&'a ManifestSource> {
        settings.bitcoin.as_ref()
    }

    fn signature(&self) -> SignatureScheme {
        SignatureScheme::Attached
    }

    // The release signer's key uses a curve the OpenPGP backend rejects.
    fn tolerates_unsupported_signature(&self) -> bool {
        true
    }

    fn artifact_tuple(&self, target: &Tuple) -> Result<String, InstallError> {
        let target = target.to_string();
        ALIASES
            .iter()
            .find(|(tuple, _)| *tuple == target)
            .map(|(_, alias)| (*alias).to_string())
            .ok_or_else(|| InstallError::Validation(format!("unsupported bitcoin tuple: {target}")))
    }

    fn locate_policy(&self) -> LocatePolicy {
        LocatePolicy {
            separator: None,
            exclusions: EXCLUSIONS,
        }
    }

    fn bundle_dir(&self, filename: &str) -> Result<String, InstallError> {
        VERSION_RE
            .find(filename)
            .map(|m| format!("bitcoin-{}", m.as_str()))
            .ok_or_else(|| {
                InstallError::Validation(format!("no bitcoin version in artifact name {filename}"))
            })
    }

    fn binary_dir(&self) -> &'static str {
        "bin"
    }

    fn overrides(&self, ctx: &RunContext, _component: &Component) -> Vec<Override> {
        let mut overrides = vec![
            Override::new("#rpcuser=", &ctx.credentials.username),
            Override::new("#rpcpassword=", &ctx.credentials.password),
            Override::new("#server=", "1"),
            Override::new("#prune=", "550"),
            Override::new("#debug=", "rpc"),
        ];
        match ctx.settings.network {
            Network::Mainnet => {}
            Network::Testnet => overrides.push(Override::new("#testnet=", "1")),
            Network::Simnet => overrides.push(Override::new("#regtest=", "1")),
        }
        overrides
    }
}
